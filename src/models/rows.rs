/// Rows of the five warehouse tables. Each dimension row is keyed by its
/// natural key; the fact row carries nullable foreign keys into the songs
/// and artists dimensions.

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: Option<String>,
    pub year: i32,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    /// Epoch milliseconds, the primary key shared with SongplayRow.start_time.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 1 = Sunday .. 7 = Saturday.
    pub weekday: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub songplay_id: i64,
    pub start_time: i64,
    pub user_id: String,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
    // Partition columns, derived from start_time and also materialized in
    // the table itself for downstream scan pruning
    pub year: i32,
    pub month: u32,
}
