use anyhow::{Result, anyhow};
use chrono::DateTime;
use serde_json::Value;

/// One raw song metadata record as found in the song-data prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: Option<String>,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub duration: f64,
    /// Year 0 means "unknown" in the source data and is preserved as-is.
    pub year: i32,
}

/// One raw listening-event record as found in the log-data prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub ts: i64,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
    pub page: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
}

impl SongRecord {
    pub fn from_value(item: &Value) -> Result<Self> {
        let song_id = get_string(item, "song_id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("missing song_id"))?;

        let title =
            get_string(item, "title").ok_or_else(|| anyhow!("missing title for {}", song_id))?;

        let duration = get_f64(item, "duration")
            .ok_or_else(|| anyhow!("missing duration for {}", song_id))?;

        Ok(SongRecord {
            song_id,
            title,
            artist_id: get_string(item, "artist_id").filter(|s| !s.is_empty()),
            artist_name: get_string(item, "artist_name").unwrap_or_default(),
            artist_location: get_string(item, "artist_location"),
            artist_latitude: get_f64(item, "artist_latitude"),
            artist_longitude: get_f64(item, "artist_longitude"),
            duration,
            // Null year collapses to 0, the source's own "unknown" marker
            year: get_i64(item, "year").unwrap_or(0) as i32,
        })
    }
}

impl EventRecord {
    pub fn from_value(item: &Value) -> Result<Self> {
        let ts = get_i64(item, "ts").ok_or_else(|| anyhow!("missing ts"))?;

        // Reject timestamps chrono cannot represent so that every stage
        // downstream can expand ts without a fallible path
        if DateTime::from_timestamp_millis(ts).is_none() {
            return Err(anyhow!("timestamp out of range: {}", ts));
        }

        let page = get_string(item, "page")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("missing page"))?;

        Ok(EventRecord {
            ts,
            user_id: get_id_string(item, "userId").unwrap_or_default(),
            first_name: get_string(item, "firstName").unwrap_or_default(),
            last_name: get_string(item, "lastName").unwrap_or_default(),
            gender: get_string(item, "gender").unwrap_or_default(),
            level: get_string(item, "level").unwrap_or_default(),
            session_id: get_i64(item, "sessionId").unwrap_or(0),
            location: get_string(item, "location").unwrap_or_default(),
            user_agent: get_string(item, "userAgent").unwrap_or_default(),
            page,
            song: get_string(item, "song"),
            artist: get_string(item, "artist"),
            length: get_f64(item, "length"),
        })
    }

    /// Only "NextSong" interactions are actual song plays; every other page
    /// type is excluded from all downstream tables.
    pub fn is_next_song(&self) -> bool {
        self.page == "NextSong"
    }
}

fn get_string(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn get_f64(item: &Value, key: &str) -> Option<f64> {
    item.get(key).and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    })
}

fn get_i64(item: &Value, key: &str) -> Option<i64> {
    item.get(key).and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    })
}

/// Identifier fields show up as either numbers or strings depending on the
/// log exporter version; normalize both to a string.
fn get_id_string(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(|v| match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_song_record_parsing() {
        let raw = json!({
            "num_songs": 1,
            "song_id": "SOUPIRU12A6D4FA1E1",
            "title": "Der Kleine Dompfaff",
            "artist_id": "ARJIE2Y1187B994AB7",
            "artist_name": "Line Renaud",
            "artist_location": "",
            "artist_latitude": null,
            "artist_longitude": null,
            "duration": 152.92036,
            "year": 0
        });

        let record = SongRecord::from_value(&raw).unwrap();
        assert_eq!(record.song_id, "SOUPIRU12A6D4FA1E1");
        assert_eq!(record.title, "Der Kleine Dompfaff");
        assert_eq!(record.artist_id.as_deref(), Some("ARJIE2Y1187B994AB7"));
        assert_eq!(record.duration, 152.92036);
        assert_eq!(record.year, 0);
        assert!(record.artist_latitude.is_none());
    }

    #[test]
    fn test_song_record_missing_id_is_rejected() {
        let raw = json!({"title": "No Id", "duration": 10.0});
        assert!(SongRecord::from_value(&raw).is_err());

        let raw = json!({"song_id": "", "title": "Empty Id", "duration": 10.0});
        assert!(SongRecord::from_value(&raw).is_err());
    }

    #[test]
    fn test_event_record_parsing() {
        let raw = json!({
            "artist": "Survivor",
            "auth": "Logged In",
            "firstName": "Jayden",
            "gender": "M",
            "itemInSession": 0,
            "lastName": "Fox",
            "length": 245.36771,
            "level": "free",
            "location": "New Orleans-Metairie, LA",
            "method": "PUT",
            "page": "NextSong",
            "registration": 1541033612796i64,
            "sessionId": 100,
            "song": "Eye Of The Tiger",
            "status": 200,
            "ts": 1541110994796i64,
            "userAgent": "Mozilla/5.0",
            "userId": "101"
        });

        let record = EventRecord::from_value(&raw).unwrap();
        assert_eq!(record.ts, 1541110994796);
        assert_eq!(record.user_id, "101");
        assert_eq!(record.session_id, 100);
        assert_eq!(record.song.as_deref(), Some("Eye Of The Tiger"));
        assert_eq!(record.length, Some(245.36771));
        assert!(record.is_next_song());
    }

    #[test]
    fn test_event_record_numeric_user_id() {
        let raw = json!({"ts": 1000, "page": "NextSong", "userId": 42});
        let record = EventRecord::from_value(&raw).unwrap();
        assert_eq!(record.user_id, "42");
    }

    #[test]
    fn test_event_record_missing_ts_is_rejected() {
        let raw = json!({"page": "NextSong", "userId": "1"});
        assert!(EventRecord::from_value(&raw).is_err());
    }

    #[test]
    fn test_non_next_song_page() {
        let raw = json!({"ts": 1000, "page": "Home", "userId": "1"});
        let record = EventRecord::from_value(&raw).unwrap();
        assert!(!record.is_next_song());
    }
}
