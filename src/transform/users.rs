use std::collections::BTreeMap;

use crate::models::{EventRecord, UserRow};

/// Projects the user-identifying fields out of qualifying events into the
/// users dimension, one row per user id.
pub struct UserExtractor;

impl UserExtractor {
    /// Name and subscription level are mutable over a user's history, so
    /// the snapshot from the event with the latest timestamp wins. When two
    /// events for a user share the maximal timestamp, the one appearing
    /// later in staged order wins.
    pub fn extract(&self, events: &[EventRecord]) -> Vec<UserRow> {
        let mut latest: BTreeMap<String, (i64, UserRow)> = BTreeMap::new();

        for event in events.iter().filter(|e| e.is_next_song()) {
            if let Some((ts, _)) = latest.get(&event.user_id) {
                if *ts > event.ts {
                    continue;
                }
            }
            latest.insert(
                event.user_id.clone(),
                (
                    event.ts,
                    UserRow {
                        user_id: event.user_id.clone(),
                        first_name: event.first_name.clone(),
                        last_name: event.last_name.clone(),
                        gender: event.gender.clone(),
                        level: event.level.clone(),
                    },
                ),
            );
        }

        latest.into_values().map(|(_, row)| row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user_id: &str, ts: i64, level: &str, page: &str) -> EventRecord {
        EventRecord {
            ts,
            user_id: user_id.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            gender: "F".to_string(),
            level: level.to_string(),
            session_id: 1,
            location: String::new(),
            user_agent: String::new(),
            page: page.to_string(),
            song: None,
            artist: None,
            length: None,
        }
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let events = vec![
            event("U1", 2000, "paid", "NextSong"),
            event("U1", 1000, "free", "NextSong"),
        ];

        let users = UserExtractor.extract(&events);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].level, "paid");
    }

    #[test]
    fn test_equal_timestamps_later_event_wins() {
        let events = vec![
            event("U1", 1000, "free", "NextSong"),
            event("U1", 1000, "paid", "NextSong"),
        ];

        let users = UserExtractor.extract(&events);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].level, "paid");
    }

    #[test]
    fn test_non_play_events_are_excluded() {
        let events = vec![
            event("U1", 1000, "free", "NextSong"),
            event("U1", 2000, "paid", "Home"),
            event("U2", 1000, "free", "Logout"),
        ];

        let users = UserExtractor.extract(&events);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "U1");
        assert_eq!(users[0].level, "free");
    }

    #[test]
    fn test_one_row_per_user() {
        let events = vec![
            event("U2", 1000, "free", "NextSong"),
            event("U1", 1000, "free", "NextSong"),
            event("U2", 3000, "free", "NextSong"),
        ];

        let users = UserExtractor.extract(&events);
        assert_eq!(users.len(), 2);
    }
}
