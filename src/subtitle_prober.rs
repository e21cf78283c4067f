//! Existing-subtitle probing
//!
//! Determines which of the requested languages already have a subtitle file
//! on disk next to a video, so the orchestrator can skip work that is
//! already done. Probing and writing share the same path derivation, which
//! is what keeps the skip-if-existing policy exact.

use crate::file_resolver::VideoFile;
use crate::language::{LanguageSet, LanguageTag};
use std::path::PathBuf;

/// Extension of the subtitle container format written next to media files
pub(crate) const SUBTITLE_EXTENSION: &str = "srt";

/// Derives the conventional subtitle path for a video and language
///
/// The convention is the video's base name, a language-tag suffix and the
/// subtitle extension, co-located with the video: `Movie.en.srt` next to
/// `Movie.mkv`. The same derivation is used for probing and for writing.
pub fn subtitle_path_for(video: &VideoFile, language: &LanguageTag) -> PathBuf {
    let file_name = format!("{}.{}.{}", video.stem(), language, SUBTITLE_EXTENSION);

    match video.path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Returns the subset of `languages` already satisfied on disk for `video`
///
/// A language counts as satisfied exactly when a file exists at its
/// conventional subtitle path. No fuzzy matching of other naming variants
/// is attempted; a differently named subtitle is treated as absent.
/// Pure filesystem read, no side effects.
pub fn probe_existing(video: &VideoFile, languages: &LanguageSet) -> Vec<LanguageTag> {
    languages
        .iter()
        .filter(|language| subtitle_path_for(video, language).exists())
        .cloned()
        .collect()
}
