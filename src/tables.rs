use anyhow::{Result, anyhow};
use polars::prelude::*;

use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

/// The five normalized tables of one pipeline run, fully materialized
/// before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseTables {
    pub songs: Vec<SongRow>,
    pub artists: Vec<ArtistRow>,
    pub users: Vec<UserRow>,
    pub time: Vec<TimeRow>,
    pub songplays: Vec<SongplayRow>,
}

pub fn songs_dataframe(rows: &[SongRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            "song_id".into(),
            rows.iter().map(|r| r.song_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "title".into(),
            rows.iter().map(|r| r.title.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "artist_id".into(),
            rows.iter().map(|r| r.artist_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "year".into(),
            rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "duration".into(),
            rows.iter().map(|r| r.duration).collect::<Vec<_>>(),
        )
        .into(),
    ];

    new_dataframe("songs", columns)
}

pub fn artists_dataframe(rows: &[ArtistRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            "artist_id".into(),
            rows.iter().map(|r| r.artist_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "name".into(),
            rows.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "location".into(),
            rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "latitude".into(),
            rows.iter().map(|r| r.latitude).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "longitude".into(),
            rows.iter().map(|r| r.longitude).collect::<Vec<_>>(),
        )
        .into(),
    ];

    new_dataframe("artists", columns)
}

pub fn users_dataframe(rows: &[UserRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            "user_id".into(),
            rows.iter().map(|r| r.user_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "first_name".into(),
            rows.iter()
                .map(|r| r.first_name.clone())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "last_name".into(),
            rows.iter().map(|r| r.last_name.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "gender".into(),
            rows.iter().map(|r| r.gender.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "level".into(),
            rows.iter().map(|r| r.level.clone()).collect::<Vec<_>>(),
        )
        .into(),
    ];

    new_dataframe("users", columns)
}

pub fn time_dataframe(rows: &[TimeRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            "start_time".into(),
            rows.iter().map(|r| r.start_time).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "hour".into(),
            rows.iter().map(|r| r.hour).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("day".into(), rows.iter().map(|r| r.day).collect::<Vec<_>>()).into(),
        Series::new(
            "week".into(),
            rows.iter().map(|r| r.week).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "month".into(),
            rows.iter().map(|r| r.month).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "year".into(),
            rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "weekday".into(),
            rows.iter().map(|r| r.weekday).collect::<Vec<_>>(),
        )
        .into(),
    ];

    new_dataframe("time", columns)
}

pub fn songplays_dataframe(rows: &[SongplayRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            "songplay_id".into(),
            rows.iter().map(|r| r.songplay_id).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "start_time".into(),
            rows.iter().map(|r| r.start_time).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "user_id".into(),
            rows.iter().map(|r| r.user_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "level".into(),
            rows.iter().map(|r| r.level.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "song_id".into(),
            rows.iter().map(|r| r.song_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "artist_id".into(),
            rows.iter().map(|r| r.artist_id.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "session_id".into(),
            rows.iter().map(|r| r.session_id).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "location".into(),
            rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "user_agent".into(),
            rows.iter()
                .map(|r| r.user_agent.clone())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "year".into(),
            rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "month".into(),
            rows.iter().map(|r| r.month).collect::<Vec<_>>(),
        )
        .into(),
    ];

    new_dataframe("songplays", columns)
}

fn new_dataframe(table: &str, columns: Vec<Column>) -> Result<DataFrame> {
    DataFrame::new(columns).map_err(|e| anyhow!("Failed to build {} DataFrame: {}", table, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_songs_dataframe_schema() {
        let rows = vec![
            SongRow {
                song_id: "S1".to_string(),
                title: "Title".to_string(),
                artist_id: Some("A1".to_string()),
                year: 1984,
                duration: 200.0,
            },
            SongRow {
                song_id: "S2".to_string(),
                title: "Other".to_string(),
                artist_id: None,
                year: 0,
                duration: 100.5,
            },
        ];

        let df = songs_dataframe(&rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.get_column_names_str(),
            vec!["song_id", "title", "artist_id", "year", "duration"]
        );
        assert_eq!(df.column("artist_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_time_dataframe_schema() {
        let rows = vec![TimeRow {
            start_time: 1542241826796,
            hour: 0,
            day: 15,
            week: 46,
            month: 11,
            year: 2018,
            weekday: 5,
        }];

        let df = time_dataframe(&rows).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(
            df.get_column_names_str(),
            vec!["start_time", "hour", "day", "week", "month", "year", "weekday"]
        );
    }

    #[test]
    fn test_songplays_dataframe_null_keys() {
        let rows = vec![SongplayRow {
            songplay_id: 0,
            start_time: 1542241826796,
            user_id: "U1".to_string(),
            level: "free".to_string(),
            song_id: None,
            artist_id: None,
            session_id: 1,
            location: String::new(),
            user_agent: String::new(),
            year: 2018,
            month: 11,
        }];

        let df = songplays_dataframe(&rows).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("song_id").unwrap().null_count(), 1);
        assert_eq!(df.column("artist_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_empty_tables_build() {
        assert_eq!(artists_dataframe(&[]).unwrap().height(), 0);
        assert_eq!(users_dataframe(&[]).unwrap().height(), 0);
    }
}
