//! The persisted CSV table and the index over previous runs.

use crate::error::Result;
use crate::matching::MatchOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// One persisted row. Field names double as the CSV header. Absent tags are
/// stored as empty strings so rows stay empty-safe through round trips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecord {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(rename = "spotifySong", default)]
    pub spotify_song: String,
    #[serde(rename = "perfectMatch")]
    pub perfect_match: bool,
    #[serde(rename = "spotifyResult1", default)]
    pub spotify_result1: String,
    #[serde(rename = "spotifyResult2", default)]
    pub spotify_result2: String,
    #[serde(rename = "spotifyResult3", default)]
    pub spotify_result3: String,
    #[serde(rename = "spotifyResult4", default)]
    pub spotify_result4: String,
    #[serde(rename = "spotifyResult5", default)]
    pub spotify_result5: String,
}

impl MatchRecord {
    pub fn new(
        filename: String,
        title: Option<&str>,
        artist: Option<&str>,
        album: Option<&str>,
        outcome: MatchOutcome,
    ) -> Self {
        let [r1, r2, r3, r4, r5] = outcome.candidates;
        MatchRecord {
            filename,
            title: title.unwrap_or_default().to_string(),
            artist: artist.unwrap_or_default().to_string(),
            album: album.unwrap_or_default().to_string(),
            spotify_song: outcome.spotify_song,
            perfect_match: outcome.perfect_match,
            spotify_result1: r1,
            spotify_result2: r2,
            spotify_result3: r3,
            spotify_result4: r4,
            spotify_result5: r5,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }
}

/// Composite lookup key over the tag triple. Missing fields become empty
/// strings so a track with no album tag still keys consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    title: String,
    artist: String,
    album: String,
}

impl RecordKey {
    pub fn new(title: Option<&str>, artist: Option<&str>, album: Option<&str>) -> Self {
        RecordKey {
            title: title.unwrap_or_default().to_string(),
            artist: artist.unwrap_or_default().to_string(),
            album: album.unwrap_or_default().to_string(),
        }
    }
}

/// Rows from a previous run, keyed by tag triple, used to skip re-querying
/// tracks the catalog already resolved.
#[derive(Debug, Default)]
pub struct RecordIndex {
    map: HashMap<RecordKey, MatchRecord>,
}

impl RecordIndex {
    /// Loads the index from an existing output CSV. A missing or unreadable
    /// file simply yields an empty index; the first run starts from nothing.
    pub fn load(path: &Path) -> Self {
        match read_records(path) {
            Ok(records) => {
                let mut index = RecordIndex::default();
                for record in records {
                    index.insert(record);
                }
                index
            }
            Err(e) => {
                debug!("No reusable records at {}: {e}", path.display());
                RecordIndex::default()
            }
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&MatchRecord> {
        self.map.get(key)
    }

    pub fn insert(&mut self, record: MatchRecord) {
        self.map.insert(record.key(), record);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn read_records(path: &Path) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Rewrites the whole table, header row included.
pub fn write_records(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Playlist-flow ordering: by artist, then album, ascending; `sort_by` is
/// stable so equal rows keep their original order.
pub fn sort_for_playlist(records: &mut [MatchRecord]) {
    records.sort_by(|a, b| a.artist.cmp(&b.artist).then_with(|| a.album.cmp(&b.album)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchOutcome;

    fn record(filename: &str, title: &str, artist: &str, album: &str) -> MatchRecord {
        MatchRecord {
            filename: filename.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            spotify_song: "https://open.spotify.com/track/abc".to_string(),
            perfect_match: true,
            spotify_result1: "Artist - Song (Album) => url".to_string(),
            spotify_result2: String::new(),
            spotify_result3: String::new(),
            spotify_result4: String::new(),
            spotify_result5: String::new(),
        }
    }

    #[test]
    fn csv_round_trip_through_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.csv");

        let original = record("song.mp3", "Song", "Artist", "Album");
        write_records(&path, std::slice::from_ref(&original)).unwrap();

        let index = RecordIndex::load(&path);
        let key = RecordKey::new(Some("Song"), Some("Artist"), Some("Album"));
        assert_eq!(index.get(&key), Some(&original));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn header_row_is_written_with_renamed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.csv");
        write_records(&path, &[record("a.mp3", "T", "A", "B")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(
            header,
            "filename,title,artist,album,spotifySong,perfectMatch,\
             spotifyResult1,spotifyResult2,spotifyResult3,spotifyResult4,spotifyResult5"
        );
        // perfectMatch serializes as the literal true/false
        assert!(contents.lines().nth(1).unwrap().contains(",true,"));
    }

    #[test]
    fn empty_fields_key_consistently() {
        let mut index = RecordIndex::default();
        index.insert(record("a.mp3", "", "Artist", ""));
        let key = RecordKey::new(None, Some("Artist"), None);
        assert!(index.get(&key).is_some());
    }

    #[test]
    fn missing_file_loads_an_empty_index() {
        let index = RecordIndex::load(Path::new("/nonexistent/library.csv"));
        assert!(index.is_empty());
    }

    #[test]
    fn sort_is_by_artist_then_album_and_stable() {
        let mut rows = vec![
            record("1.mp3", "S1", "Zeta", "A"),
            record("2.mp3", "S2", "Alpha", "B"),
            record("3.mp3", "S3", "Alpha", "A"),
            record("4.mp3", "S4", "Alpha", "A"),
        ];
        sort_for_playlist(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(order, vec!["3.mp3", "4.mp3", "2.mp3", "1.mp3"]);
    }

    #[test]
    fn record_from_outcome_pads_five_slots() {
        let outcome = MatchOutcome {
            spotify_song: String::new(),
            perfect_match: false,
            candidates: Default::default(),
        };
        let rec = MatchRecord::new("f.mp3".into(), Some("T"), None, Some("B"), outcome);
        assert_eq!(rec.artist, "");
        assert_eq!(rec.spotify_result5, "");
        assert!(!rec.perfect_match);
    }
}
