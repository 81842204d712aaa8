use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};
use crate::storage::ObjectStore;
use crate::tables::{self, WarehouseTables};

/// Directory name used for a null partition value, matching the layout
/// convention downstream scanners already understand.
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Persists the five warehouse tables as Parquet under a fixed output
/// prefix. Table paths are rewritten in place on every run; a failed put
/// aborts the run with no partially-valid table exposed as complete.
pub struct TableWriter<'a> {
    store: &'a ObjectStore,
    prefix: String,
}

impl<'a> TableWriter<'a> {
    pub fn new(store: &'a ObjectStore, prefix: &str) -> Self {
        TableWriter {
            store,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub async fn write_all(&self, tables: &WarehouseTables) -> Result<()> {
        self.write_songs(&tables.songs)
            .await
            .context("Failed to write songs table")?;
        self.write_artists(&tables.artists)
            .await
            .context("Failed to write artists table")?;
        self.write_users(&tables.users)
            .await
            .context("Failed to write users table")?;
        self.write_time(&tables.time)
            .await
            .context("Failed to write time table")?;
        self.write_songplays(&tables.songplays)
            .await
            .context("Failed to write songplays table")?;
        Ok(())
    }

    /// Songs are partitioned by year and artist id.
    async fn write_songs(&self, rows: &[SongRow]) -> Result<()> {
        if rows.is_empty() {
            // An empty table still gets materialized so downstream readers
            // see a table, not an absent path
            let mut df = tables::songs_dataframe(rows)?;
            self.write_dataframe("songs", &mut df).await?;
        }
        for (subpath, group) in song_partitions(rows) {
            let mut df = tables::songs_dataframe(&group)?;
            self.write_dataframe(&format!("songs/{}", subpath), &mut df)
                .await?;
        }
        info!("✅ songs table written ({} rows)", rows.len());
        Ok(())
    }

    async fn write_artists(&self, rows: &[ArtistRow]) -> Result<()> {
        let mut df = tables::artists_dataframe(rows)?;
        self.write_dataframe("artists", &mut df).await?;
        info!("✅ artists table written ({} rows)", rows.len());
        Ok(())
    }

    async fn write_users(&self, rows: &[UserRow]) -> Result<()> {
        let mut df = tables::users_dataframe(rows)?;
        self.write_dataframe("users", &mut df).await?;
        info!("✅ users table written ({} rows)", rows.len());
        Ok(())
    }

    /// Time rows are partitioned by year and month.
    async fn write_time(&self, rows: &[TimeRow]) -> Result<()> {
        if rows.is_empty() {
            let mut df = tables::time_dataframe(rows)?;
            self.write_dataframe("time", &mut df).await?;
        }
        for (subpath, group) in time_partitions(rows) {
            let mut df = tables::time_dataframe(&group)?;
            self.write_dataframe(&format!("time/{}", subpath), &mut df)
                .await?;
        }
        info!("✅ time table written ({} rows)", rows.len());
        Ok(())
    }

    /// Songplays are partitioned by the year and month of the play.
    async fn write_songplays(&self, rows: &[SongplayRow]) -> Result<()> {
        if rows.is_empty() {
            let mut df = tables::songplays_dataframe(rows)?;
            self.write_dataframe("songplays", &mut df).await?;
        }
        for (subpath, group) in songplay_partitions(rows) {
            let mut df = tables::songplays_dataframe(&group)?;
            self.write_dataframe(&format!("songplays/{}", subpath), &mut df)
                .await?;
        }
        info!("✅ songplays table written ({} rows)", rows.len());
        Ok(())
    }

    async fn write_dataframe(&self, table_path: &str, df: &mut DataFrame) -> Result<()> {
        let mut buf = Vec::new();
        {
            let writer = ParquetWriter::new(&mut buf);
            writer.finish(df)?;
        }

        let key = format!("{}/{}/data.parquet", self.prefix, table_path);
        self.store.put_object(&key, &buf).await?;
        Ok(())
    }
}

pub fn song_partitions(rows: &[SongRow]) -> BTreeMap<String, Vec<SongRow>> {
    let mut partitions: BTreeMap<String, Vec<SongRow>> = BTreeMap::new();
    for row in rows {
        let artist = row.artist_id.as_deref().unwrap_or(NULL_PARTITION);
        let subpath = format!("year={}/artist_id={}", row.year, artist);
        partitions.entry(subpath).or_default().push(row.clone());
    }
    partitions
}

pub fn time_partitions(rows: &[TimeRow]) -> BTreeMap<String, Vec<TimeRow>> {
    let mut partitions: BTreeMap<String, Vec<TimeRow>> = BTreeMap::new();
    for row in rows {
        let subpath = format!("year={}/month={}", row.year, row.month);
        partitions.entry(subpath).or_default().push(row.clone());
    }
    partitions
}

pub fn songplay_partitions(rows: &[SongplayRow]) -> BTreeMap<String, Vec<SongplayRow>> {
    let mut partitions: BTreeMap<String, Vec<SongplayRow>> = BTreeMap::new();
    for row in rows {
        let subpath = format!("year={}/month={}", row.year, row.month);
        partitions.entry(subpath).or_default().push(row.clone());
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(song_id: &str, artist_id: Option<&str>, year: i32) -> SongRow {
        SongRow {
            song_id: song_id.to_string(),
            title: "Title".to_string(),
            artist_id: artist_id.map(|s| s.to_string()),
            year,
            duration: 100.0,
        }
    }

    #[test]
    fn test_song_partition_paths() {
        let rows = vec![
            song("S1", Some("A1"), 1984),
            song("S2", Some("A1"), 1984),
            song("S3", Some("A2"), 1999),
        ];

        let partitions = song_partitions(&rows);
        let paths: Vec<&String> = partitions.keys().collect();
        assert_eq!(paths, vec!["year=1984/artist_id=A1", "year=1999/artist_id=A2"]);
        assert_eq!(partitions["year=1984/artist_id=A1"].len(), 2);
    }

    #[test]
    fn test_null_artist_partition() {
        let rows = vec![song("S1", None, 0)];

        let partitions = song_partitions(&rows);
        assert!(partitions.contains_key("year=0/artist_id=__HIVE_DEFAULT_PARTITION__"));
    }

    #[test]
    fn test_time_partition_paths() {
        let rows = vec![
            crate::models::TimeRow {
                start_time: 1,
                hour: 0,
                day: 1,
                week: 44,
                month: 11,
                year: 2018,
                weekday: 5,
            },
            crate::models::TimeRow {
                start_time: 2,
                hour: 0,
                day: 1,
                week: 49,
                month: 12,
                year: 2018,
                weekday: 7,
            },
        ];

        let partitions = time_partitions(&rows);
        let paths: Vec<&String> = partitions.keys().collect();
        assert_eq!(paths, vec!["year=2018/month=11", "year=2018/month=12"]);
    }
}
