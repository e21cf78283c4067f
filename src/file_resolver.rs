//! File resolver module for locating candidate video files
//!
//! This module provides functionality to resolve a root path (a single file
//! or a directory) into the list of video files a run should process,
//! identified by their file extension.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Video file extensions recognized by the locator, lowercase
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "ts", "m2ts", "webm", "mpg", "mpeg", "m4v",
];

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// The root path does not exist
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read a directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read a directory entry
    #[error("Failed to read directory entry: {0}")]
    ReadEntryFailed(#[from] io::Error),
}

/// The kind of media a video file appears to be
///
/// Inferred from the file name only and handed to providers as a search
/// hint; nothing else in the pipeline depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Episode { season: u32, episode: u32 },
}

/// A candidate video file discovered by the locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Path to the video file
    pub path: PathBuf,
    /// Inferred media kind
    pub kind: MediaKind,
}

impl VideoFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        let kind = infer_media_kind(&path);
        Self { path, kind }
    }

    /// The file stem used for search queries and subtitle naming
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Resolves a root path into the list of video files to process
///
/// If `root` is a single file it is yielded exactly when its extension is a
/// recognized video extension. If `root` is a directory, every recognized
/// video directly inside it is yielded; with `recursive` set, subdirectories
/// are descended without depth limit.
///
/// Ordering follows filesystem traversal order, which is platform dependent.
/// Callers may rely on completeness, not on any particular order.
pub fn locate_videos(root: &Path, recursive: bool) -> Result<Vec<VideoFile>, FileResolverError> {
    if !root.exists() {
        return Err(FileResolverError::NotFound(root.to_path_buf()));
    }

    let mut videos = Vec::new();

    if root.is_file() {
        if has_video_extension(root) {
            videos.push(VideoFile::new(root.to_path_buf()));
        }
        return Ok(videos);
    }

    scan_directory(root, recursive, &mut videos)?;
    Ok(videos)
}

/// Scans one directory level, descending when `recursive` is set
fn scan_directory(
    dir_path: &Path,
    recursive: bool,
    videos: &mut Vec<VideoFile>,
) -> Result<(), FileResolverError> {
    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                scan_directory(&path, recursive, videos)?;
            }
        } else if path.is_file() && has_video_extension(&path) {
            videos.push(VideoFile::new(path));
        }
    }

    Ok(())
}

/// Checks whether a path carries a recognized video extension
fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Infers the media kind from an `SxxEyy` token in the file stem
///
/// `Show.S02E05.mkv` is an episode of season 2; anything without such a
/// token is treated as a movie.
fn infer_media_kind(path: &Path) -> MediaKind {
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return MediaKind::Movie,
    };

    let bytes = stem.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'S' && bytes[i] != b's' {
            continue;
        }

        let (season, rest) = match take_number(&bytes[i + 1..]) {
            Some(parsed) => parsed,
            None => continue,
        };

        if rest.first().is_some_and(|&c| c == b'E' || c == b'e') {
            if let Some((episode, _)) = take_number(&rest[1..]) {
                return MediaKind::Episode { season, episode };
            }
        }
    }

    MediaKind::Movie
}

/// Parses a leading run of at most four digits, returning it and the tail
fn take_number(bytes: &[u8]) -> Option<(u32, &[u8])> {
    let digits = bytes.iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 4 {
        return None;
    }

    let number = std::str::from_utf8(&bytes[..digits])
        .ok()?
        .parse::<u32>()
        .ok()?;
    Some((number, &bytes[digits..]))
}
