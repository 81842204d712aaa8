use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::{EventRecord, SongRecord};
use crate::storage::ObjectStore;

/// How many raw objects are downloaded at a time. Downloads are buffered
/// in listing order so records always stage in the same sequence.
const DOWNLOAD_CONCURRENCY: usize = 8;

/// Counters for one staged read of a prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub objects: usize,
    pub parsed: usize,
    pub dropped: usize,
}

/// Stages raw records out of the object store. An unreachable prefix or
/// object fails the run; an individual record that does not match the
/// expected schema is dropped and counted.
pub struct RecordReader<'a> {
    store: &'a ObjectStore,
}

impl<'a> RecordReader<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        RecordReader { store }
    }

    pub async fn read_song_records(&self, prefix: &str) -> Result<(Vec<SongRecord>, ReadStats)> {
        self.read_records(prefix, "song", SongRecord::from_value)
            .await
    }

    pub async fn read_event_records(&self, prefix: &str) -> Result<(Vec<EventRecord>, ReadStats)> {
        self.read_records(prefix, "event", EventRecord::from_value)
            .await
    }

    async fn read_records<T>(
        &self,
        prefix: &str,
        kind: &str,
        convert: fn(&Value) -> Result<T>,
    ) -> Result<(Vec<T>, ReadStats)> {
        let keys = self
            .store
            .list_json_objects(prefix)
            .await
            .with_context(|| format!("Failed to list {} objects under {}", kind, prefix))?;

        info!("Found {} {} objects under {}", keys.len(), kind, prefix);

        let mut stats = ReadStats {
            objects: keys.len(),
            ..ReadStats::default()
        };
        let mut records = Vec::new();

        let mut downloads = futures::stream::iter(keys.into_iter().map(|key| async move {
            let content = self.store.get_text(&key).await?;
            Ok::<_, anyhow::Error>((key, content))
        }))
        .buffered(DOWNLOAD_CONCURRENCY);

        while let Some(download) = downloads.next().await {
            let (key, content) =
                download.with_context(|| format!("Failed to read {} object", kind))?;

            for raw in parse_json_records(&content, &key, &mut stats.dropped) {
                match convert(&raw) {
                    Ok(record) => {
                        records.push(record);
                        stats.parsed += 1;
                    }
                    Err(e) => {
                        stats.dropped += 1;
                        warn!("Dropped malformed {} record in {}: {}", kind, key, e);
                    }
                }
            }
        }

        info!(
            "Staged {} {} records ({} dropped) from {} objects",
            stats.parsed, kind, stats.dropped, stats.objects
        );

        Ok((records, stats))
    }
}

/// Splits one object's content into raw JSON records. Accepts a single
/// object, a JSON array, or newline-delimited records; unparseable lines
/// count as dropped records rather than failing the object.
fn parse_json_records(content: &str, key: &str, dropped: &mut usize) -> Vec<Value> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items,
            other => vec![other],
        };
    }

    let mut records = Vec::new();
    for (line_no, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(value),
            Err(e) => {
                *dropped += 1;
                warn!("Unparseable record at {}:{}: {}", key, line_no + 1, e);
            }
        }
    }
    records
}
