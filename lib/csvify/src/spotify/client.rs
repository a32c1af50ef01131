use crate::error::{Result, SpotifyError};
use crate::spotify::auth::Session;
use crate::spotify::models::{
    PlaylistObject, SearchResponse, SnapshotResponse, TrackHit, UserProfile,
};
use reqwest::{header::AUTHORIZATION, Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_API_BASE: &str = "https://api.spotify.com";

/// Fixed page size of the search endpoint.
const SEARCH_PAGE_SIZE: usize = 50;

const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Authenticated Web API client. Holds the one session handle for the whole
/// run; no other state survives between calls.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: Url,
    session: Session,
    client: Client,
    rate_limit_backoff: Duration,
}

#[derive(Default)]
pub struct CatalogClientBuilder {
    base_url: Option<String>,
    session: Option<Session>,
    rate_limit_backoff: Option<Duration>,
}

impl CatalogClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Override the API base URL, mainly for tests against a mock server.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// How long to sleep before retrying a rate-limited search page.
    pub fn rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = Some(backoff);
        self
    }

    pub fn build(self) -> Result<CatalogClient> {
        let base_url_str = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let base_url = Url::parse(base_url_str.trim_end_matches('/'))?;
        let session = self.session.ok_or(SpotifyError::NotConfigured)?;

        if session.is_expired() {
            warn!("Session token is already expired, remote calls will fail");
        }

        Ok(CatalogClient {
            base_url,
            session,
            client: Client::new(),
            rate_limit_backoff: self.rate_limit_backoff.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF),
        })
    }
}

impl CatalogClient {
    fn api_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("/v1/{endpoint}"))?)
    }

    async fn make_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<B>,
    ) -> Result<T> {
        debug!("Request: {} {}", method, url);
        let mut request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.session.access_token));
        if let Some(b) = body {
            request = request.json(&b);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SpotifyError::RateLimited);
        }
        if status.is_success() {
            let text = response.text().await?;
            let payload = if text.trim().is_empty() { "null" } else { &text };
            serde_json::from_str(payload).map_err(|e| SpotifyError::Api {
                status: status.as_u16(),
                message: format!("JSON parse error: {e}"),
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(SpotifyError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Runs one full-text track search and materializes every page before
    /// returning.
    ///
    /// Pages of 50 from offset 0 while `offset < total`, where `total` is
    /// re-read from each response. A rate-limited page is retried at the
    /// same offset after a fixed backoff, with no retry cap; any other
    /// failure aborts the whole search and drops the pages accumulated so
    /// far.
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<TrackHit>> {
        let mut results = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut url = self.api_url("search")?;
            url.query_pairs_mut()
                .append_pair("q", query)
                .append_pair("type", "track")
                .append_pair("limit", &SEARCH_PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            match self
                .make_request::<SearchResponse, ()>(Method::GET, url, None)
                .await
            {
                Ok(page) => {
                    let total = page.tracks.total;
                    results.extend(page.tracks.items.into_iter().map(TrackHit::from));
                    offset += SEARCH_PAGE_SIZE;
                    if offset >= total {
                        break;
                    }
                }
                Err(SpotifyError::RateLimited) => {
                    warn!(
                        "Rate limited, retrying offset {} in {:?}",
                        offset, self.rate_limit_backoff
                    );
                    tokio::time::sleep(self.rate_limit_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    pub async fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        let url = self.api_url(&format!("playlists/{playlist_id}"))?;
        let playlist: PlaylistObject = self.make_request(Method::GET, url, None::<()>).await?;
        Ok(playlist.name)
    }

    /// Wipes the playlist and sets it to exactly `uris`.
    pub async fn replace_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.mutate_playlist(Method::PUT, playlist_id, uris).await
    }

    /// Appends `uris` to the end of the playlist.
    pub async fn add_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.mutate_playlist(Method::POST, playlist_id, uris).await
    }

    async fn mutate_playlist(
        &self,
        method: Method,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<()> {
        let url = self.api_url(&format!("playlists/{playlist_id}/tracks"))?;
        let body = serde_json::json!({ "uris": uris });
        let snapshot: SnapshotResponse = self.make_request(method, url, Some(body)).await?;
        debug!("Playlist now at snapshot {}", snapshot.snapshot_id);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        let url = self.api_url("me")?;
        self.make_request(Method::GET, url, None::<()>).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use mockito::Matcher;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn test_session() -> Session {
        Session {
            access_token: "test-token".into(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    fn test_client(base_url: &str) -> CatalogClient {
        CatalogClientBuilder::new()
            .base_url(base_url)
            .session(test_session())
            .rate_limit_backoff(Duration::from_millis(5))
            .build()
            .unwrap()
    }

    /// JSON body of one search page with `count` tracks starting at `start`.
    fn page_body(start: usize, count: usize, total: usize) -> String {
        let items: Vec<serde_json::Value> = (start..start + count)
            .map(|i| {
                serde_json::json!({
                    "id": format!("id{i}"),
                    "name": format!("Track {i}"),
                    "external_urls": { "spotify": format!("https://open.spotify.com/track/id{i}") },
                    "artists": [{ "name": "Artist" }],
                    "album": { "name": "Album" },
                })
            })
            .collect();
        serde_json::json!({ "tracks": { "items": items, "total": total } }).to_string()
    }

    #[tokio::test]
    async fn search_accumulates_all_pages() {
        let mut server = mockito::Server::new_async().await;

        let first = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "abba".into()),
                Matcher::UrlEncoded("type".into(), "track".into()),
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .match_header("authorization", "Bearer test-token")
            .with_body(page_body(0, 50, 75))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::UrlEncoded("offset".into(), "50".into()))
            .with_body(page_body(50, 25, 75))
            .expect(1)
            .create_async()
            .await;

        let hits = test_client(&server.url())
            .search_tracks("abba")
            .await
            .unwrap();

        assert_eq!(hits.len(), 75);
        assert_eq!(hits[0].id, "id0");
        assert_eq!(hits[74].id, "id74");
        assert_eq!(hits[74].url, "https://open.spotify.com/track/id74");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn search_empty_result_set() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::Any)
            .with_body(page_body(0, 0, 0))
            .expect(1)
            .create_async()
            .await;

        let hits = test_client(&server.url()).search_tracks("nothing").await.unwrap();
        assert!(hits.is_empty());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limited_page_is_retried_at_same_offset() {
        let mut server = mockito::Server::new_async().await;

        // The two matchers are disjoint via the shared flag, so mock
        // precedence does not matter: the first request gets a 429, the
        // retry gets the real page.
        let limited_seen = Arc::new(AtomicBool::new(false));
        let flip = limited_seen.clone();
        let limited = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::Any)
            .match_request(move |_| !flip.swap(true, Ordering::SeqCst))
            .with_status(429)
            .with_body("rate limit exceeded")
            .expect(1)
            .create_async()
            .await;

        let after = limited_seen.clone();
        let ok = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
            .match_request(move |_| after.load(Ordering::SeqCst))
            .with_body(page_body(0, 2, 2))
            .expect(1)
            .create_async()
            .await;

        let hits = test_client(&server.url()).search_tracks("query").await.unwrap();

        // Full result set, nothing dropped, nothing duplicated.
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "id0");
        assert_eq!(hits[1].id, "id1");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn non_rate_limit_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let err = test_client(&server.url())
            .search_tracks("query")
            .await
            .unwrap_err();
        match err {
            SpotifyError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        m.assert_async().await;
    }

    #[tokio::test]
    async fn current_user_falls_back_to_id() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v1/me")
            .with_body(r#"{"id": "user1", "display_name": null}"#)
            .expect(1)
            .create_async()
            .await;

        let profile = test_client(&server.url()).current_user().await.unwrap();
        assert_eq!(profile.label(), "user1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn playlist_name_is_read_from_the_playlist_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v1/playlists/p1")
            .with_body(r#"{"name": "Road Trip"}"#)
            .expect(1)
            .create_async()
            .await;

        let name = test_client(&server.url()).playlist_name("p1").await.unwrap();
        assert_eq!(name, "Road Trip");
        m.assert_async().await;
    }
}
