pub mod error;
pub mod library;
pub mod matching;
pub mod normalize;
pub mod playlist;
pub mod records;
pub mod spotify;

pub use error::{Result, SpotifyError};
pub use library::{list_files, read_track, LocalTrack};
pub use matching::{find_match, MatchOutcome};
pub use records::{MatchRecord, RecordIndex, RecordKey};
pub use spotify::{CatalogClient, CatalogClientBuilder, Session, TrackHit};
