use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::models::{EventRecord, SongRecord};
use crate::reader::{ReadStats, RecordReader};
use crate::storage::{ObjectStore, TableWriter};
use crate::tables::WarehouseTables;
use crate::transform::{SongDecomposer, SongplayBuilder, TimeExpander, UserExtractor};

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub song_read: ReadStats,
    pub event_read: ReadStats,
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

/// The whole reshaping step as a pure function of the staged record sets.
/// Dimension derivations are independent of each other; the fact builder
/// runs last, against the completed songs/artists dimensions.
pub fn transform(song_records: &[SongRecord], event_records: &[EventRecord]) -> WarehouseTables {
    let (songs, artists) = SongDecomposer.decompose(song_records);
    let users = UserExtractor.extract(event_records);
    let time = TimeExpander.expand(event_records);
    let songplays = SongplayBuilder.build(event_records, &songs, &artists);

    WarehouseTables {
        songs,
        artists,
        users,
        time,
        songplays,
    }
}

/// Stage both record sets, transform them into the star schema and persist
/// all five tables. Read and write failures abort the run.
pub async fn run(store: &ObjectStore, config: &PipelineConfig) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    info!("Starting warehouse run {}", run_id);

    let reader = RecordReader::new(store);

    let (song_records, song_read) = reader
        .read_song_records(&config.input.song_prefix)
        .await
        .context("Failed to stage song records")?;

    let (event_records, event_read) = reader
        .read_event_records(&config.input.log_prefix)
        .await
        .context("Failed to stage event records")?;

    let tables = transform(&song_records, &event_records);
    info!(
        "Derived tables: {} songs, {} artists, {} users, {} time, {} songplays",
        tables.songs.len(),
        tables.artists.len(),
        tables.users.len(),
        tables.time.len(),
        tables.songplays.len()
    );

    let writer = TableWriter::new(store, &config.output.prefix);
    writer.write_all(&tables).await?;

    Ok(RunSummary {
        run_id,
        song_read,
        event_read,
        songs: tables.songs.len(),
        artists: tables.artists.len(),
        users: tables.users.len(),
        time: tables.time.len(),
        songplays: tables.songplays.len(),
    })
}
