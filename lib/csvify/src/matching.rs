//! Two-strategy catalog matching for one local track.
//!
//! Strategy A searches with title, artist and album filters; strategy B
//! drops the album. Selection is strict either/or: A wins whenever it has
//! any results at all, B is only consulted when A comes back empty.

use crate::error::Result;
use crate::normalize::normalize;
use crate::spotify::{CatalogClient, TrackHit};

/// How many candidate summaries a record carries.
pub const RESULT_SLOTS: usize = 5;

/// Enrichment computed for one local track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Perfect match URL, else the top-ranked candidate's URL, else empty.
    pub spotify_song: String,
    pub perfect_match: bool,
    /// Up to five rendered candidates in result order, padded with "".
    pub candidates: [String; RESULT_SLOTS],
}

/// Runs both search strategies concurrently and reduces the selected result
/// set to a [`MatchOutcome`]. Network failures from either strategy
/// propagate; the caller decides whether to skip the track.
pub async fn find_match(
    client: &CatalogClient,
    title: Option<&str>,
    artist: Option<&str>,
    album: Option<&str>,
) -> Result<MatchOutcome> {
    let with_album = build_query(title, artist, album);
    let without_album = build_query(title, artist, None);

    let (a, b) = tokio::try_join!(
        client.search_tracks(&with_album),
        client.search_tracks(&without_album),
    )?;

    let hits = select_results(a, b);
    Ok(MatchOutcome::from_hits(&hits, title, artist, album))
}

/// Free-text term plus the catalog's structured filters for whatever fields
/// are present, all normalized.
fn build_query(title: Option<&str>, artist: Option<&str>, album: Option<&str>) -> String {
    let mut query = normalize(title).unwrap_or_default();
    if let Some(artist) = normalize(artist) {
        query.push_str(&format!(" artist:{artist}"));
    }
    if let Some(album) = normalize(album) {
        query.push_str(&format!(" album:{album}"));
    }
    query
}

/// Strict either/or between the strategies, never a union.
fn select_results(with_album: Vec<TrackHit>, without_album: Vec<TrackHit>) -> Vec<TrackHit> {
    if with_album.is_empty() {
        without_album
    } else {
        with_album
    }
}

/// First hit whose normalized name, album and primary artist all equal the
/// normalized inputs.
fn find_perfect<'a>(
    hits: &'a [TrackHit],
    title: Option<&str>,
    artist: Option<&str>,
    album: Option<&str>,
) -> Option<&'a TrackHit> {
    let title = normalize(title);
    let artist = normalize(artist);
    let album = normalize(album);

    hits.iter().find(|hit| {
        normalize(Some(&hit.name)) == title
            && normalize(Some(&hit.album)) == album
            && normalize(hit.artists.first().map(String::as_str)) == artist
    })
}

/// Raw (non-normalized) candidate summary for the CSV.
fn render_hit(hit: &TrackHit) -> String {
    format!(
        "{} - {} ({}) => {}",
        hit.artists.first().map(String::as_str).unwrap_or_default(),
        hit.name,
        hit.album,
        hit.url
    )
}

impl MatchOutcome {
    pub fn from_hits(
        hits: &[TrackHit],
        title: Option<&str>,
        artist: Option<&str>,
        album: Option<&str>,
    ) -> Self {
        let perfect = find_perfect(hits, title, artist, album);
        let spotify_song = perfect
            .or_else(|| hits.first())
            .map(|hit| hit.url.clone())
            .unwrap_or_default();

        let mut candidates: [String; RESULT_SLOTS] = Default::default();
        for (slot, hit) in candidates.iter_mut().zip(hits.iter()) {
            *slot = render_hit(hit);
        }

        MatchOutcome {
            spotify_song,
            perfect_match: perfect.is_some(),
            candidates,
        }
    }
}
