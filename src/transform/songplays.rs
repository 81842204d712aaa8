use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::Datelike;

use crate::models::{ArtistRow, EventRecord, SongRow, SongplayRow};

/// Natural key of the dimension lookup: the event's song title, artist name
/// and song duration. Title and artist alone are ambiguous (two different
/// songs can share both), so the exact duration acts as the tie-break.
#[derive(Debug, PartialEq, Eq, Hash)]
struct LookupKey {
    title: String,
    artist: String,
    duration_bits: u64,
}

impl LookupKey {
    fn new(title: &str, artist: &str, duration: f64) -> Self {
        LookupKey {
            title: title.to_string(),
            artist: artist.to_string(),
            duration_bits: duration.to_bits(),
        }
    }
}

/// Builds the songplays fact table: one row per qualifying event, with the
/// song/artist foreign keys resolved against the completed dimensions.
pub struct SongplayBuilder;

impl SongplayBuilder {
    /// The dimensions must be fully materialized before this runs; the
    /// lookup is the single ordering barrier of the pipeline.
    ///
    /// Zero matches leaves both foreign keys null and keeps the row (the
    /// common case, the event log covers far more songs than the staged
    /// sample). When duplicate (title, artist, duration) tuples exist in
    /// the dimensions, the entry with the smallest song id wins.
    pub fn build(
        &self,
        events: &[EventRecord],
        songs: &[SongRow],
        artists: &[ArtistRow],
    ) -> Vec<SongplayRow> {
        let artist_names: HashMap<&str, &str> = artists
            .iter()
            .map(|a| (a.artist_id.as_str(), a.name.as_str()))
            .collect();

        let mut lookup: HashMap<LookupKey, (String, String)> = HashMap::new();
        for song in songs {
            let Some(artist_id) = &song.artist_id else {
                continue;
            };
            // A dangling artist reference cannot satisfy the both-or-neither
            // key invariant, so it contributes no lookup entry
            let Some(artist_name) = artist_names.get(artist_id.as_str()) else {
                continue;
            };

            let key = LookupKey::new(&song.title, artist_name, song.duration);
            match lookup.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert((song.song_id.clone(), artist_id.clone()));
                }
                Entry::Occupied(mut slot) => {
                    if song.song_id < slot.get().0 {
                        slot.insert((song.song_id.clone(), artist_id.clone()));
                    }
                }
            }
        }

        events
            .iter()
            .filter(|e| e.is_next_song())
            .enumerate()
            .map(|(index, event)| {
                let resolved = match (&event.song, &event.artist, event.length) {
                    (Some(song), Some(artist), Some(length)) => {
                        lookup.get(&LookupKey::new(song, artist, length)).cloned()
                    }
                    _ => None,
                };
                let (song_id, artist_id) = match resolved {
                    Some((song_id, artist_id)) => (Some(song_id), Some(artist_id)),
                    None => (None, None),
                };

                let dt = super::event_datetime(event.ts);
                SongplayRow {
                    songplay_id: index as i64,
                    start_time: event.ts,
                    user_id: event.user_id.clone(),
                    level: event.level.clone(),
                    song_id,
                    artist_id,
                    session_id: event.session_id,
                    location: event.location.clone(),
                    user_agent: event.user_agent.clone(),
                    year: dt.year(),
                    month: dt.month(),
                }
            })
            .collect()
    }
}
