//! Reads the written warehouse tables back from the object store and
//! re-checks their integrity: unique primary keys, resolvable fact foreign
//! keys, and the both-or-neither rule for the fact's song/artist keys.

use std::collections::HashSet;
use std::io::Cursor;

use anyhow::{Context, Result, anyhow};
use polars::io::SerReader;
use polars::prelude::*;
use songplay_etl::config::PipelineConfig;
use songplay_etl::storage::ObjectStore;
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    info!("🔎 Validating warehouse tables");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "src/configs/pipeline.toml".to_string());

    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load pipeline configuration from {}", config_path))?;

    let store =
        ObjectStore::from_config(&config.store).context("Failed to initialize object store")?;

    let prefix = config.output.prefix.trim_end_matches('/');

    let songs = load_table(&store, prefix, "songs").await?;
    let artists = load_table(&store, prefix, "artists").await?;
    let users = load_table(&store, prefix, "users").await?;
    let time = load_table(&store, prefix, "time").await?;
    let songplays = load_table(&store, prefix, "songplays").await?;

    let mut violations = 0;

    violations += check_unique_strings(&songs, "songs", "song_id")?;
    violations += check_unique_strings(&artists, "artists", "artist_id")?;
    violations += check_unique_strings(&users, "users", "user_id")?;
    violations += check_unique_timestamps(&time)?;
    violations += check_fact_references(&songplays, &songs, &artists, &users, &time)?;

    if violations == 0 {
        info!("🎉 All warehouse invariants hold");
        Ok(())
    } else {
        error!("❌ {} invariant violations found", violations);
        std::process::exit(1);
    }
}

/// Fetch every Parquet partition of a table and stack them into one frame.
async fn load_table(store: &ObjectStore, prefix: &str, table: &str) -> Result<DataFrame> {
    let table_prefix = format!("{}/{}/", prefix, table);
    let keys: Vec<String> = store
        .list_parquet_objects(&table_prefix)
        .await
        .with_context(|| format!("Failed to list {} partitions", table))?;

    if keys.is_empty() {
        return Err(anyhow!("No Parquet objects found under {}", table_prefix));
    }

    let mut combined: Option<DataFrame> = None;
    for key in &keys {
        let bytes = store.get_object(key).await?;
        let df = ParquetReader::new(Cursor::new(bytes))
            .finish()
            .with_context(|| format!("Failed to read Parquet object {}", key))?;
        combined = Some(match combined {
            Some(acc) => acc
                .vstack(&df)
                .with_context(|| format!("Partition schema mismatch at {}", key))?,
            None => df,
        });
    }

    let df = combined.ok_or_else(|| anyhow!("No partitions loaded for {}", table))?;
    info!(
        "Loaded {} with {} rows from {} partitions",
        table,
        df.height(),
        keys.len()
    );
    Ok(df)
}

fn string_keys(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

fn check_unique_strings(df: &DataFrame, table: &str, column: &str) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for key in string_keys(df, column)?.into_iter().flatten() {
        if !seen.insert(key.clone()) {
            error!("Duplicate {} in {}: {}", column, table, key);
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

fn check_unique_timestamps(time: &DataFrame) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for ts in time.column("start_time")?.i64()?.into_iter().flatten() {
        if !seen.insert(ts) {
            error!("Duplicate start_time in time: {}", ts);
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

fn check_fact_references(
    songplays: &DataFrame,
    songs: &DataFrame,
    artists: &DataFrame,
    users: &DataFrame,
    time: &DataFrame,
) -> Result<usize> {
    let song_keys: HashSet<String> = string_keys(songs, "song_id")?.into_iter().flatten().collect();
    let artist_keys: HashSet<String> = string_keys(artists, "artist_id")?
        .into_iter()
        .flatten()
        .collect();
    let user_keys: HashSet<String> = string_keys(users, "user_id")?.into_iter().flatten().collect();
    let time_keys: HashSet<i64> = time
        .column("start_time")?
        .i64()?
        .into_iter()
        .flatten()
        .collect();

    let start_times = songplays.column("start_time")?.i64()?;
    let fact_users = string_keys(songplays, "user_id")?;
    let fact_songs = string_keys(songplays, "song_id")?;
    let fact_artists = string_keys(songplays, "artist_id")?;

    let mut violations = 0;

    for idx in 0..songplays.height() {
        if let Some(ts) = start_times.get(idx) {
            if !time_keys.contains(&ts) {
                error!("songplay row {} references missing start_time {}", idx, ts);
                violations += 1;
            }
        }

        if let Some(user_id) = &fact_users[idx] {
            if !user_keys.contains(user_id) {
                error!("songplay row {} references missing user {}", idx, user_id);
                violations += 1;
            }
        }

        match (&fact_songs[idx], &fact_artists[idx]) {
            (Some(song_id), Some(artist_id)) => {
                if !song_keys.contains(song_id) {
                    error!("songplay row {} references missing song {}", idx, song_id);
                    violations += 1;
                }
                if !artist_keys.contains(artist_id) {
                    error!(
                        "songplay row {} references missing artist {}",
                        idx, artist_id
                    );
                    violations += 1;
                }
            }
            (None, None) => {}
            _ => {
                error!(
                    "songplay row {} has mismatched song/artist key nullability",
                    idx
                );
                violations += 1;
            }
        }
    }

    Ok(violations)
}
