//! Result writer
//!
//! Persists fetched subtitle content to the conventional on-disk location
//! next to the source media. The writer is the only component that mutates
//! the filesystem.

use crate::file_resolver::VideoFile;
use crate::language::LanguageTag;
use crate::subtitle_prober::subtitle_path_for;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing a subtitle file
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to write the subtitle file
    #[error("Failed to write subtitle file {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Outcome of a single subtitle write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The subtitle was written to the returned path
    Written(PathBuf),
    /// A subtitle already existed at the returned path and was left untouched
    SkippedExisting(PathBuf),
}

/// Writes subtitle content to the conventional path for (video, language)
///
/// If a file already exists at the target path and `force` is not set, the
/// existing file is left untouched and `SkippedExisting` is returned;
/// repeating the call is side-effect free. Otherwise the content is written
/// verbatim, overwriting any existing file.
pub fn write_subtitle(
    video: &VideoFile,
    language: &LanguageTag,
    content: &[u8],
    force: bool,
) -> Result<WriteOutcome, WriteError> {
    let target = subtitle_path_for(video, language);

    if !force && target.exists() {
        return Ok(WriteOutcome::SkippedExisting(target));
    }

    fs::write(&target, content).map_err(|e| WriteError::WriteFailed {
        path: target.clone(),
        source: e,
    })?;

    Ok(WriteOutcome::Written(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempTree;

    fn tag(s: &str) -> LanguageTag {
        LanguageTag::parse(s).unwrap()
    }

    #[test]
    fn test_write_creates_conventional_file() {
        let tree = TempTree::new("writer_create");
        let video = VideoFile::new(tree.touch("Movie.mkv"));

        let outcome = write_subtitle(&video, &tag("en"), b"subtitle body", false).unwrap();

        let expected = tree.path().join("Movie.en.srt");
        assert_eq!(outcome, WriteOutcome::Written(expected.clone()));
        assert_eq!(fs::read(expected).unwrap(), b"subtitle body");
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let tree = TempTree::new("writer_existing");
        let video = VideoFile::new(tree.touch("Movie.mkv"));
        let target = tree.path().join("Movie.en.srt");
        fs::write(&target, b"original").unwrap();

        let outcome = write_subtitle(&video, &tag("en"), b"replacement", false).unwrap();

        assert_eq!(outcome, WriteOutcome::SkippedExisting(target.clone()));
        assert_eq!(fs::read(target).unwrap(), b"original");
    }

    #[test]
    fn test_force_overwrites_existing_file() {
        let tree = TempTree::new("writer_force");
        let video = VideoFile::new(tree.touch("Movie.mkv"));
        let target = tree.path().join("Movie.en.srt");
        fs::write(&target, b"original").unwrap();

        let outcome = write_subtitle(&video, &tag("en"), b"replacement", true).unwrap();

        assert_eq!(outcome, WriteOutcome::Written(target.clone()));
        assert_eq!(fs::read(target).unwrap(), b"replacement");
    }

    #[test]
    fn test_content_is_written_verbatim() {
        let tree = TempTree::new("writer_verbatim");
        let video = VideoFile::new(tree.touch("Movie.mkv"));

        // Windows line endings and a UTF-8 BOM must survive untouched
        let content = b"\xef\xbb\xbf1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n";
        write_subtitle(&video, &tag("en"), content, false).unwrap();

        let written = fs::read(tree.path().join("Movie.en.srt")).unwrap();
        assert_eq!(written, content);
    }
}
