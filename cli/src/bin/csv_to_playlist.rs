//! Replays a library CSV into a Spotify playlist: rows with a confirmed
//! track URL are sorted, batched and applied, the first batch replacing the
//! playlist's existing contents.

use anyhow::{bail, Result};
use clap::Parser;
use cli::config;
use csvify::spotify::auth;
use csvify::{playlist, records, CatalogClientBuilder};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "csv-to-playlist")]
#[command(about = "Bulk-update a Spotify playlist from a library CSV file")]
struct Args {
    /// Library CSV produced by library-to-csv
    #[arg(long, env = "LIBRARY_CSV")]
    csv: Option<PathBuf>,

    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    spotify_client_secret: Option<String>,

    /// Target playlist id; ALL items currently in it will be replaced
    #[arg(long = "playlist-id", env = "PLAYLIST_ID")]
    playlist_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();

    let args = Args::parse();

    let csv_path = PathBuf::from(config::resolve(
        args.csv.map(|p| p.display().to_string()),
        "Library CSV Path",
    )?);
    let client_id = config::resolve(args.spotify_client_id, "Spotify Client ID")?;
    let client_secret =
        config::resolve_secret(args.spotify_client_secret, "Spotify Client Secret")?;
    let playlist_id = config::resolve(
        args.playlist_id,
        "Playlist ID (all items in playlist will be replaced!)",
    )?;
    if playlist_id.is_empty() {
        bail!("Playlist ID must be provided");
    }

    let session = auth::user_login(&client_id, &client_secret).await?;
    let client = CatalogClientBuilder::new().session(session).build()?;

    info!("Logged in as {}", client.current_user().await?.label());

    let mut rows = records::read_records(&csv_path)?;
    records::sort_for_playlist(&mut rows);
    let urls = playlist::confirmed_track_urls(&rows);
    info!("Found {} songs from CSV file to add to playlist", urls.len());

    let playlist_name = client.playlist_name(&playlist_id).await?;
    playlist::apply(&client, &playlist_id, &urls, &playlist_name).await?;

    info!("Playlist updated");
    Ok(())
}
