use std::collections::BTreeSet;

use chrono::{Datelike, Timelike};

use crate::models::{EventRecord, TimeRow};

/// Expands each distinct timestamp among qualifying events into a
/// time-dimension row with its derived calendar attributes.
pub struct TimeExpander;

impl TimeExpander {
    pub fn expand(&self, events: &[EventRecord]) -> Vec<TimeRow> {
        let distinct: BTreeSet<i64> = events
            .iter()
            .filter(|e| e.is_next_song())
            .map(|e| e.ts)
            .collect();

        distinct.into_iter().map(TimeRow::from_ts).collect()
    }
}

impl TimeRow {
    pub fn from_ts(ts: i64) -> Self {
        let dt = super::event_datetime(ts);
        TimeRow {
            start_time: ts,
            hour: dt.hour(),
            day: dt.day(),
            week: dt.iso_week().week(),
            month: dt.month(),
            year: dt.year(),
            // Spark dayofweek convention: 1 = Sunday .. 7 = Saturday
            weekday: dt.weekday().num_days_from_sunday() + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: i64, page: &str) -> EventRecord {
        EventRecord {
            ts,
            user_id: "U1".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            gender: String::new(),
            level: "free".to_string(),
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
    fn test_calendar_attributes() {
        // 2018-11-15T00:30:26.796Z, a Thursday in ISO week 46
        let row = TimeRow::from_ts(1542241826796);
        assert_eq!(row.start_time, 1542241826796);
        assert_eq!(row.hour, 0);
        assert_eq!(row.day, 15);
        assert_eq!(row.week, 46);
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, 5);
    }

    #[test]
    fn test_sunday_is_weekday_one() {
        // 2018-11-18T12:00:00Z was a Sunday
        let row = TimeRow::from_ts(1542542400000);
        assert_eq!(row.weekday, 1);
        assert_eq!(row.hour, 12);
    }

    #[test]
    fn test_shared_timestamps_collapse_to_one_row() {
        let events = vec![
            event(1542241826796, "NextSong"),
            event(1542241826796, "NextSong"),
            event(1542241826797, "NextSong"),
        ];

        let rows = TimeExpander.expand(&events);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_non_play_events_are_excluded() {
        let events = vec![
            event(1542241826796, "Home"),
            event(1542241826797, "NextSong"),
        ];

        let rows = TimeExpander.expand(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_time, 1542241826797);
    }
}
