//! Bulk playlist update from confirmed track URLs.

use crate::error::Result;
use crate::records::MatchRecord;
use crate::spotify::CatalogClient;
use tracing::info;

/// Canonical track URL shape; anything else is silently dropped.
pub const TRACK_URL_PREFIX: &str = "https://open.spotify.com/track/";

const TRACK_URI_SCHEME: &str = "spotify:track:";

/// Hard limit of the playlist mutation endpoints.
const BATCH_SIZE: usize = 100;

/// One mutation call's worth of URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistBatch {
    pub uris: Vec<String>,
    /// The first batch replaces the playlist so stale entries are wiped;
    /// every later batch appends. Reversing this would only ever append.
    pub replace: bool,
}

/// The `spotifySong` URLs of rows that carry a canonical track URL, in row
/// order.
pub fn confirmed_track_urls(records: &[MatchRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|record| record.spotify_song.starts_with(TRACK_URL_PREFIX))
        .map(|record| record.spotify_song.clone())
        .collect()
}

/// Converts a track URL to the catalog's native URI form by taking the
/// trailing path segment as the track id.
fn url_to_uri(url: &str) -> String {
    let id = url.rsplit('/').next().unwrap_or_default();
    format!("{TRACK_URI_SCHEME}{id}")
}

/// Splits the URLs into consecutive batches of at most [`BATCH_SIZE`] URIs,
/// preserving order, with the replace flag set on the first batch only.
pub fn plan_batches(urls: &[String]) -> Vec<PlaylistBatch> {
    urls.chunks(BATCH_SIZE)
        .enumerate()
        .map(|(i, chunk)| PlaylistBatch {
            uris: chunk.iter().map(|url| url_to_uri(url)).collect(),
            replace: i == 0,
        })
        .collect()
}

/// Applies the batches in order. No rollback on mid-sequence failure:
/// already-applied batches stay applied remotely and the error propagates.
pub async fn apply(
    client: &CatalogClient,
    playlist_id: &str,
    urls: &[String],
    playlist_name: &str,
) -> Result<()> {
    for batch in plan_batches(urls) {
        info!(
            "Adding next {} songs to playlist \"{}\"...",
            batch.uris.len(),
            playlist_name
        );
        if batch.replace {
            client.replace_playlist_items(playlist_id, &batch.uris).await?;
        } else {
            client.add_playlist_items(playlist_id, &batch.uris).await?;
        }
    }
    Ok(())
}
