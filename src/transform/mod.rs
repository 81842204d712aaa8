pub mod songplays;
pub mod songs;
pub mod time;
pub mod users;

pub use songplays::*;
pub use songs::*;
pub use time::*;
pub use users::*;

use chrono::{DateTime, Utc};

/// Expand an event timestamp into a datetime. The record parser rejects
/// timestamps chrono cannot represent, so the fallback never fires for
/// records that reached a transform stage.
pub(crate) fn event_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts).unwrap_or(DateTime::UNIX_EPOCH)
}
