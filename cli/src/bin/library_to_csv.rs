//! Scans a local music library, matches every track against the Spotify
//! catalog and writes the mapping to a CSV file. Rows from a previous run at
//! the same output path are reused instead of re-queried.

use anyhow::{bail, Result};
use clap::Parser;
use cli::config;
use csvify::spotify::auth;
use csvify::{find_match, library, records, CatalogClientBuilder, MatchRecord, RecordIndex, RecordKey};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "library-to-csv")]
#[command(about = "Map a local music library to Spotify tracks in a CSV file")]
struct Args {
    /// Directory or file to scan; may be given multiple times
    #[arg(long = "path", required = true)]
    paths: Vec<PathBuf>,

    /// Output CSV path (created if it does not exist; existing rows are reused)
    #[arg(long)]
    out: PathBuf,

    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    spotify_client_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();

    let args = Args::parse();
    if args.out.extension().and_then(|e| e.to_str()) != Some("csv") {
        bail!("--out path must end with .csv");
    }

    let client_id = config::resolve(args.spotify_client_id, "Spotify Client ID")?;
    let client_secret =
        config::resolve_secret(args.spotify_client_secret, "Spotify Client Secret")?;

    let session = auth::client_credentials(&client_id, &client_secret).await?;
    let client = CatalogClientBuilder::new().session(session).build()?;

    let index = RecordIndex::load(&args.out);
    if !index.is_empty() {
        info!(
            "Reusing {} previously matched tracks from {}",
            index.len(),
            args.out.display()
        );
    }

    let mut rows: Vec<MatchRecord> = Vec::new();
    for file in library::list_files(&args.paths) {
        let Some(track) = library::read_track(&file) else {
            continue;
        };

        let key = RecordKey::new(
            track.title.as_deref(),
            track.artist.as_deref(),
            track.album.as_deref(),
        );
        if let Some(existing) = index.get(&key) {
            info!(
                "[SKIP] {}: Already exists in {}",
                file.display(),
                args.out.display()
            );
            rows.push(existing.clone());
            continue;
        }

        let outcome = find_match(
            &client,
            track.title.as_deref(),
            track.artist.as_deref(),
            track.album.as_deref(),
        )
        .await?;

        let record = MatchRecord::new(
            track.filename(),
            track.title.as_deref(),
            track.artist.as_deref(),
            track.album.as_deref(),
            outcome,
        );
        info!(
            "{}: {} - {}, {}",
            record.filename,
            record.artist,
            record.title,
            if record.spotify_song.is_empty() {
                "(no matching Spotify track found)"
            } else {
                &record.spotify_song
            }
        );
        rows.push(record);
    }

    records::write_records(&args.out, &rows)?;
    info!("Wrote {} rows to {}", rows.len(), args.out.display());
    Ok(())
}
