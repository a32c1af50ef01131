use serde::Deserialize;

/// One track from a catalog search, flattened for matching and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHit {
    pub id: String,
    pub url: String,
    pub name: String,
    /// Credited artists in catalog order; the first one is the primary artist.
    pub artists: Vec<String>,
    pub album: String,
}

// Internal structs for deserializing raw API responses
#[derive(Deserialize, Debug)]
pub(crate) struct SearchResponse {
    pub tracks: TrackPage,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TrackPage {
    pub items: Vec<TrackObject>,
    pub total: usize,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TrackObject {
    pub id: String,
    pub name: String,
    pub external_urls: ExternalUrls,
    pub artists: Vec<ArtistObject>,
    pub album: AlbumObject,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ExternalUrls {
    pub spotify: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ArtistObject {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AlbumObject {
    pub name: String,
}

impl From<TrackObject> for TrackHit {
    fn from(track: TrackObject) -> Self {
        TrackHit {
            id: track.id,
            url: track.external_urls.spotify,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.name,
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct PlaylistObject {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SnapshotResponse {
    pub snapshot_id: String,
}

/// Current-user profile, used for the post-login greeting.
#[derive(Deserialize, Debug)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}
