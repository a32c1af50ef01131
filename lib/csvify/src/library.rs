//! Local library scanning: file listing and tag extraction.

use crate::error::Result;
use lofty::{Accessor, Probe, TaggedFileExt};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// One scanned audio file. Tags that could not be read stay `None`; a file
/// whose tags could not be parsed at all is skipped by [`read_track`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub file_path: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl LocalTrack {
    /// Base name of the file, as stored in the CSV.
    pub fn filename(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Flattens the given roots (directories recursed, plain files kept as-is)
/// into one sorted file list.
pub fn list_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = roots
        .iter()
        .flat_map(|root| {
            WalkDir::new(root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
        })
        .collect();
    files.sort();
    files
}

/// Reads the tags of one file. Unparseable files are logged and skipped,
/// never fatal to the batch.
pub fn read_track(path: &Path) -> Option<LocalTrack> {
    match read_tags(path) {
        Ok(track) => Some(track),
        Err(e) => {
            warn!("[SKIP] {}: {e}", path.display());
            None
        }
    }
}

fn read_tags(path: &Path) -> Result<LocalTrack> {
    let tagged = Probe::open(path)?.read()?;
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

    Ok(LocalTrack {
        file_path: path.to_path_buf(),
        title: tag.and_then(|t| t.title().map(|v| v.to_string())),
        artist: tag.and_then(|t| t.artist().map(|v| v.to_string())),
        album: tag.and_then(|t| t.album().map(|v| v.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn list_files_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        fs::write(nested.join("a.flac"), b"x").unwrap();

        let files = list_files(&[dir.path().to_path_buf()]);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.mp3"));
        assert!(files[1].ends_with("nested/a.flac"));
    }

    #[test]
    fn a_plain_file_root_is_listed_as_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();

        let files = list_files(&[file.clone()]);
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn unparseable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-audio.txt");
        fs::write(&file, b"plain text, no tags here").unwrap();

        assert!(read_track(&file).is_none());
    }

    #[test]
    fn filename_is_the_base_name() {
        let track = LocalTrack {
            file_path: PathBuf::from("/music/artist/song.mp3"),
            title: None,
            artist: None,
            album: None,
        };
        assert_eq!(track.filename(), "song.mp3");
    }
}
