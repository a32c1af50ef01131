//! Token acquisition against the Spotify accounts service.
//!
//! Two flows: app-only client credentials (enough for search and playlist
//! reads) and the authorization-code flow (required for playlist mutation),
//! which catches the redirect on a fixed local port and exchanges the code
//! using HTTP Basic auth of client id and secret.

use crate::error::{Result, SpotifyError};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const REDIRECT_PORT: u16 = 8888;
const REDIRECT_PATH: &str = "/callback";
const USER_SCOPES: &str = "playlist-modify-public playlist-modify-private";

/// Base URL of the accounts service, overridable for tests.
fn accounts_base() -> String {
    std::env::var("SPOTIFY_ACCOUNTS_BASE").unwrap_or_else(|_| DEFAULT_ACCOUNTS_BASE.into())
}

fn redirect_uri() -> String {
    format!("http://127.0.0.1:{REDIRECT_PORT}{REDIRECT_PATH}")
}

/// An authenticated session handle. Obtained once, then passed by reference
/// into every component that talks to the Web API.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) access_token: String,
    pub(crate) expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(30) >= self.expires_at
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        }
    }
}

fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

async fn request_token(
    client_id: &str,
    client_secret: &str,
    params: &[(&str, &str)],
) -> Result<Session> {
    let url = format!("{}/api/token", accounts_base());
    let response = reqwest::Client::new()
        .post(&url)
        .header(AUTHORIZATION, basic_auth_header(client_id, client_secret))
        .form(params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SpotifyError::Auth(format!(
            "token request failed: {status} - {body}"
        )));
    }

    let token: TokenResponse = response.json().await?;
    let session = Session::from(token);
    debug!("Obtained access token, expires at {}", session.expires_at);
    Ok(session)
}

/// App-only login. Sufficient for catalog search and playlist reads.
pub async fn client_credentials(client_id: &str, client_secret: &str) -> Result<Session> {
    request_token(
        client_id,
        client_secret,
        &[("grant_type", "client_credentials")],
    )
    .await
}

/// User-delegated login via the authorization-code flow. Opens the consent
/// page in a browser, waits for the redirect on the local listener and
/// exchanges the authorization code for an access token.
pub async fn user_login(client_id: &str, client_secret: &str) -> Result<Session> {
    let state: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    let redirect = redirect_uri();
    let authorize_url = Url::parse_with_params(
        &format!("{}/authorize", accounts_base()),
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect.as_str()),
            ("scope", USER_SCOPES),
            ("state", state.as_str()),
        ],
    )?;

    // Bind before opening the browser so the redirect cannot race us.
    let listener = TcpListener::bind(("127.0.0.1", REDIRECT_PORT)).await?;

    info!("Waiting for Spotify consent at {}", authorize_url);
    if webbrowser::open(authorize_url.as_str()).is_err() {
        warn!("Could not open a browser, please visit the URL above manually");
    }

    let code = wait_for_code(listener, &state).await?;

    request_token(
        client_id,
        client_secret,
        &[
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("redirect_uri", &redirect),
        ],
    )
    .await
}

/// Accepts connections until one carries the consent redirect, answers the
/// browser, and returns the authorization code.
async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Result<String> {
    loop {
        let (mut stream, _) = listener.accept().await?;

        let mut buf = vec![0u8; 2048];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();

        let target = match request_target(&request) {
            Some(t) => t,
            None => {
                respond(&mut stream, "400 Bad Request", "Malformed request").await;
                continue;
            }
        };

        // Browsers also ask for /favicon.ico on the same port.
        if !target.starts_with(REDIRECT_PATH) {
            respond(&mut stream, "404 Not Found", "Not found").await;
            continue;
        }

        match parse_redirect(&target, expected_state) {
            Ok(code) => {
                respond(
                    &mut stream,
                    "200 OK",
                    "Login complete, you can close this tab.",
                )
                .await;
                return Ok(code);
            }
            Err(e) => {
                respond(&mut stream, "400 Bad Request", &format!("Login failed: {e}")).await;
                return Err(e);
            }
        }
    }
}

/// Request target of the first line, e.g. "/callback?code=..&state=..".
fn request_target(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    if method != "GET" {
        return None;
    }
    parts.next().map(|t| t.to_string())
}

/// Extracts the authorization code from the redirect target, verifying the
/// state parameter and surfacing a denied consent as an error.
fn parse_redirect(target: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(&format!("http://127.0.0.1{target}"))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(SpotifyError::Auth(format!("consent denied: {value}"))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(SpotifyError::Auth("state mismatch in redirect".into()));
    }

    code.ok_or_else(|| SpotifyError::Auth("redirect carried no authorization code".into()))
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer the redirect request: {e}");
    }
}
