use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Non-success HTTP response from the Web API, body included verbatim.
    #[error("Spotify API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 429. Callers inside the search loop retry; everyone else
    /// propagates it like any other API failure.
    #[error("rate limited by the Spotify API")]
    RateLimited,

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("client is not configured")]
    NotConfigured,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Tag(#[from] lofty::LoftyError),
}
