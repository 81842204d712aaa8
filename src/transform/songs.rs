use std::collections::BTreeMap;

use crate::models::{ArtistRow, SongRecord, SongRow};

/// Splits each staged song record into a songs-dimension candidate and an
/// artists-dimension candidate, deduplicating each by its natural key.
pub struct SongDecomposer;

impl SongDecomposer {
    /// Duplicate keys are a data quality artifact of the source; there is
    /// no authoritative ordering among song records, so the last record
    /// processed wins for both tables. Records are processed in staged
    /// order (object key order, then line order), which keeps the outcome
    /// stable across runs.
    pub fn decompose(&self, records: &[SongRecord]) -> (Vec<SongRow>, Vec<ArtistRow>) {
        let mut songs: BTreeMap<String, SongRow> = BTreeMap::new();
        let mut artists: BTreeMap<String, ArtistRow> = BTreeMap::new();

        for record in records {
            songs.insert(
                record.song_id.clone(),
                SongRow {
                    song_id: record.song_id.clone(),
                    title: record.title.clone(),
                    artist_id: record.artist_id.clone(),
                    year: record.year,
                    duration: record.duration,
                },
            );

            // A record without an artist id contributes no artist row;
            // the song row keeps its null foreign key
            if let Some(artist_id) = &record.artist_id {
                artists.insert(
                    artist_id.clone(),
                    ArtistRow {
                        artist_id: artist_id.clone(),
                        name: record.artist_name.clone(),
                        location: record.artist_location.clone(),
                        latitude: record.artist_latitude,
                        longitude: record.artist_longitude,
                    },
                );
            }
        }

        (
            songs.into_values().collect(),
            artists.into_values().collect(),
        )
    }
}
