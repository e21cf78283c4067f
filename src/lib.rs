//! Sublify - Fetch matching subtitles for your video files
//!
//! This library provides the core functionality for scanning a path for
//! video files, deciding which requested languages still need subtitles,
//! fetching them from subtitle providers, and saving them next to the
//! media.

mod cache;
mod file_resolver;
mod language;
mod provider;
mod session;
mod subtitle_prober;
#[cfg(test)]
mod test_support;
mod writer;

use session::{FetchRequest, FetchResult, ProviderSession};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// Re-export error types
pub use cache::CacheError;
pub use file_resolver::FileResolverError;
pub use language::LanguageError;
pub use provider::ProviderError;
pub use session::SessionError;
pub use writer::WriteError;

// Re-export the vocabulary types and operations the binary works with
pub use file_resolver::{MediaKind, VideoFile, locate_videos};
pub use language::{LanguageSet, LanguageTag};
pub use provider::{Credentials, ProviderKind, SubtitleCandidate};
pub use subtitle_prober::{probe_existing, subtitle_path_for};
pub use writer::{WriteOutcome, write_subtitle};

/// The resolved set of options for one invocation
///
/// Built once at startup from command-line flags and environment variables;
/// immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// File or directory to process
    pub root: PathBuf,
    /// Languages to fetch, in request order
    pub languages: LanguageSet,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Prefer subtitles authored for hearing-impaired viewers
    pub hearing_impaired: bool,
    /// Fetch and overwrite even when subtitles already exist
    pub force: bool,
    /// Report intended fetches without network or filesystem side effects
    pub dry_run: bool,
    /// Providers to query
    pub providers: Vec<ProviderKind>,
    /// Minimum acceptable provider-reported score
    pub min_score: f32,
    /// Pause between files that contacted a provider
    pub delay: Duration,
    /// Transient-failure retries per provider request
    pub retries: u32,
    /// Provider account credentials, if configured in the environment
    pub credentials: Option<Credentials>,
}

/// Counters describing a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Video files the batch loop looked at
    pub files_processed: usize,
    /// Subtitle files written to disk
    pub subtitles_written: usize,
    /// Languages skipped: already on disk, or no acceptable match
    pub subtitles_skipped: usize,
    /// Per-language and per-file failures recorded without aborting
    pub errors: usize,
}

/// Progress event emitted during a run
///
/// These events allow library users to track progress and provide feedback;
/// the library itself never prints.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The run started
    Started {
        root: PathBuf,
        languages: LanguageSet,
    },

    /// Scanning finished
    VideosFound { count: usize },

    /// A configured provider failed to come up and was dropped from the run
    ProviderSkipped { provider: String, reason: String },

    /// A video file is being processed
    ProcessingFile {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// Some requested languages are already satisfied on disk
    AlreadySatisfied {
        path: PathBuf,
        languages: Vec<LanguageTag>,
    },

    /// Dry-run: these languages would be fetched for this file
    WouldFetch {
        path: PathBuf,
        languages: Vec<LanguageTag>,
    },

    /// Querying providers for the residual languages of a file
    Searching {
        path: PathBuf,
        languages: Vec<LanguageTag>,
    },

    /// A subtitle was fetched and written
    SubtitleWritten {
        path: PathBuf,
        language: LanguageTag,
        provider: String,
        score: f32,
        size: u64,
    },

    /// A subtitle file already existed and was left untouched
    SubtitleExists { path: PathBuf, language: LanguageTag },

    /// No provider had an acceptable match for this language
    NoMatch { path: PathBuf, language: LanguageTag },

    /// Fetching one language failed after retries
    FetchFailed {
        path: PathBuf,
        language: LanguageTag,
        error: String,
    },

    /// Writing a fetched subtitle failed
    WriteFailed {
        path: PathBuf,
        language: LanguageTag,
        error: String,
    },

    /// The run completed
    Complete { summary: RunSummary },
}

/// Top-level error type for fatal conditions
///
/// Everything else is contained per file or per language and shows up in
/// the run summary instead.
#[derive(Debug, Error)]
pub enum SublifyError {
    /// The root path could not be resolved
    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),

    /// The provider session could not be opened
    #[error("Provider session error: {0}")]
    Session(#[from] SessionError),
}

/// Fetches subtitles for every video under the configured root
///
/// This is the batch driver. It scans the root path for video files,
/// computes per file which requested languages still need a subtitle,
/// fetches those through the provider session and writes the results next
/// to the media. Per-file and per-language failures are recorded in the
/// returned [`RunSummary`] and never abort the batch; only a bad root path
/// or a failed session open do.
///
/// Progress events are emitted through the provided callback, allowing
/// callers to display status or remain silent.
///
/// # Examples
///
/// ```no_run
/// use sublify::{fetch_subtitles, LanguageSet, LanguageTag, ProviderKind, RunConfiguration};
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// let config = RunConfiguration {
///     root: PathBuf::from("/media/movies"),
///     languages: LanguageSet::new([LanguageTag::parse("en").unwrap()]),
///     recursive: true,
///     hearing_impaired: false,
///     force: false,
///     dry_run: false,
///     providers: ProviderKind::baseline(),
///     min_score: 0.0,
///     delay: Duration::from_secs(1),
///     retries: 1,
///     credentials: None,
/// };
///
/// let summary = fetch_subtitles(&config, |_event| {}).unwrap();
/// println!("wrote {} subtitle(s)", summary.subtitles_written);
/// ```
pub fn fetch_subtitles<F>(
    config: &RunConfiguration,
    mut progress_callback: F,
) -> Result<RunSummary, SublifyError>
where
    F: FnMut(ProgressEvent),
{
    progress_callback(ProgressEvent::Started {
        root: config.root.clone(),
        languages: config.languages.clone(),
    });

    let videos = locate_videos(&config.root, config.recursive)?;
    progress_callback(ProgressEvent::VideosFound {
        count: videos.len(),
    });

    if videos.is_empty() {
        let summary = RunSummary::default();
        progress_callback(ProgressEvent::Complete {
            summary: summary.clone(),
        });
        return Ok(summary);
    }

    // Dry-run must not perform any network I/O, so the session (whose open
    // authenticates against providers) is never created in that mode
    let session = if config.dry_run {
        None
    } else {
        let session = ProviderSession::open(config)?;
        for (provider, reason) in session.skipped_providers() {
            progress_callback(ProgressEvent::ProviderSkipped {
                provider: provider.clone(),
                reason: reason.clone(),
            });
        }
        Some(session)
    };

    let summary = process_batch(config, session.as_ref(), &videos, &mut progress_callback);

    progress_callback(ProgressEvent::Complete {
        summary: summary.clone(),
    });

    Ok(summary)
}

/// Runs the batch loop over already-located videos with an optional session
///
/// Separated from [`fetch_subtitles`] so the policy logic can be exercised
/// against injected provider doubles.
fn process_batch<F>(
    config: &RunConfiguration,
    session: Option<&ProviderSession>,
    videos: &[VideoFile],
    progress_callback: &mut F,
) -> RunSummary
where
    F: FnMut(ProgressEvent),
{
    let mut summary = RunSummary::default();
    let total = videos.len();

    for (index, video) in videos.iter().enumerate() {
        progress_callback(ProgressEvent::ProcessingFile {
            index,
            total,
            path: video.path.clone(),
        });

        let contacted_provider =
            process_file(config, session, video, &mut summary, progress_callback);
        summary.files_processed += 1;

        // The inter-file delay exists solely to respect provider-side rate
        // limits: skip it after the last file and after files that made no
        // provider call
        let is_last = index + 1 == total;
        if contacted_provider && !is_last && !config.delay.is_zero() {
            std::thread::sleep(config.delay);
        }
    }

    summary
}

/// Resolves one video file; returns whether a provider was contacted
fn process_file<F>(
    config: &RunConfiguration,
    session: Option<&ProviderSession>,
    video: &VideoFile,
    summary: &mut RunSummary,
    progress_callback: &mut F,
) -> bool
where
    F: FnMut(ProgressEvent),
{
    // Languages already satisfied on disk are excluded from the residual
    // set; force ignores the disk state entirely
    let existing = if config.force {
        Vec::new()
    } else {
        probe_existing(video, &config.languages)
    };

    if !existing.is_empty() {
        summary.subtitles_skipped += existing.len();
        progress_callback(ProgressEvent::AlreadySatisfied {
            path: video.path.clone(),
            languages: existing.clone(),
        });
    }

    let residual: Vec<LanguageTag> = config
        .languages
        .iter()
        .filter(|language| !existing.contains(language))
        .cloned()
        .collect();

    if residual.is_empty() {
        return false;
    }

    if config.dry_run {
        progress_callback(ProgressEvent::WouldFetch {
            path: video.path.clone(),
            languages: residual,
        });
        return false;
    }

    let Some(session) = session else {
        return false;
    };

    progress_callback(ProgressEvent::Searching {
        path: video.path.clone(),
        languages: residual.clone(),
    });

    let results = session.fetch(&FetchRequest {
        video,
        languages: &residual,
    });

    for result in results {
        match result {
            FetchResult::Found {
                language,
                provider,
                score,
                content,
            } => match write_subtitle(video, &language, &content, config.force) {
                Ok(WriteOutcome::Written(target)) => {
                    summary.subtitles_written += 1;
                    progress_callback(ProgressEvent::SubtitleWritten {
                        path: target,
                        language,
                        provider,
                        score,
                        size: content.len() as u64,
                    });
                }
                Ok(WriteOutcome::SkippedExisting(target)) => {
                    summary.subtitles_skipped += 1;
                    progress_callback(ProgressEvent::SubtitleExists {
                        path: target,
                        language,
                    });
                }
                Err(error) => {
                    summary.errors += 1;
                    progress_callback(ProgressEvent::WriteFailed {
                        path: video.path.clone(),
                        language,
                        error: error.to_string(),
                    });
                }
            },
            FetchResult::NotFound { language } => {
                summary.subtitles_skipped += 1;
                progress_callback(ProgressEvent::NoMatch {
                    path: video.path.clone(),
                    language,
                });
            }
            FetchResult::Failed { language, error } => {
                summary.errors += 1;
                progress_callback(ProgressEvent::FetchFailed {
                    path: video.path.clone(),
                    language,
                    error,
                });
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CallCounters, RECORDED_SUBTITLE, RecordingProvider, TempTree};

    fn tag(s: &str) -> LanguageTag {
        LanguageTag::parse(s).unwrap()
    }

    fn config_for(root: PathBuf, languages: &[&str]) -> RunConfiguration {
        RunConfiguration {
            root,
            languages: LanguageSet::new(languages.iter().map(|l| tag(l))),
            recursive: false,
            hearing_impaired: false,
            force: false,
            dry_run: false,
            providers: ProviderKind::baseline(),
            min_score: 0.0,
            delay: Duration::ZERO,
            retries: 1,
            credentials: None,
        }
    }

    /// Runs the batch loop against a session built from the given provider
    fn run_with_provider(
        config: &RunConfiguration,
        provider: RecordingProvider,
    ) -> (RunSummary, CallCounters) {
        let counters = provider.counters();
        let session = ProviderSession::with_providers(
            vec![Box::new(provider)],
            config.retries,
            config.min_score,
            config.hearing_impaired,
        );

        let videos = locate_videos(&config.root, config.recursive).unwrap();
        let summary = process_batch(config, Some(&session), &videos, &mut |_| {});
        (summary, counters)
    }

    #[test]
    fn test_single_file_single_language_written() {
        let tree = TempTree::new("orchestrator_simple");
        let video = tree.touch("Movie.mkv");
        let config = config_for(video, &["en"]);

        let (summary, counters) =
            run_with_provider(&config, RecordingProvider::with_match("en", 8.5));

        assert_eq!(
            summary,
            RunSummary {
                files_processed: 1,
                subtitles_written: 1,
                subtitles_skipped: 0,
                errors: 0,
            }
        );
        assert_eq!(counters.searches(), 1);
        assert_eq!(
            std::fs::read(tree.path().join("Movie.en.srt")).unwrap(),
            RECORDED_SUBTITLE
        );
    }

    #[test]
    fn test_fully_satisfied_file_makes_no_provider_calls() {
        let tree = TempTree::new("orchestrator_satisfied");
        tree.touch("Movie.mkv");
        tree.touch("Movie.en.srt");
        tree.touch("Movie.hi.srt");
        let config = config_for(tree.path().to_path_buf(), &["en", "hi"]);

        let (summary, counters) =
            run_with_provider(&config, RecordingProvider::with_match("en", 8.5));

        assert_eq!(counters.provider_calls(), 0);
        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.subtitles_skipped, 2);
        assert_eq!(summary.subtitles_written, 0);
    }

    #[test]
    fn test_partially_satisfied_file_requests_only_residual() {
        let tree = TempTree::new("orchestrator_residual");
        tree.touch("Movie.mkv");
        tree.touch("Movie.en.srt");
        let config = config_for(tree.path().to_path_buf(), &["en", "hi"]);

        let provider = RecordingProvider::with_candidates(vec![
            RecordingProvider::candidate("en", 8.0, false),
            RecordingProvider::candidate("hi", 8.0, false),
        ]);
        let (summary, counters) = run_with_provider(&config, provider);

        // Only the missing language reaches the provider
        assert_eq!(counters.searches(), 1);
        assert_eq!(summary.subtitles_written, 1);
        assert_eq!(summary.subtitles_skipped, 1);
        assert!(tree.path().join("Movie.hi.srt").exists());
    }

    #[test]
    fn test_non_recursive_directory_processes_only_top_level() {
        let tree = TempTree::new("orchestrator_toplevel");
        tree.touch("a.mkv");
        tree.touch("b.mkv");
        tree.touch("c.mkv");
        tree.touch("season1/d.mkv");
        let config = config_for(tree.path().to_path_buf(), &["en"]);

        let (summary, _) = run_with_provider(&config, RecordingProvider::with_match("en", 8.0));

        assert_eq!(summary.files_processed, 3);
        assert_eq!(summary.subtitles_written, 3);
        assert!(!tree.path().join("season1/d.en.srt").exists());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let tree = TempTree::new("orchestrator_idempotent");
        tree.touch("Movie.mkv");
        let config = config_for(tree.path().to_path_buf(), &["en"]);

        let (first, _) = run_with_provider(&config, RecordingProvider::with_match("en", 8.0));
        assert_eq!(first.subtitles_written, 1);

        let (second, counters) =
            run_with_provider(&config, RecordingProvider::with_match("en", 8.0));
        assert_eq!(second.subtitles_written, 0);
        assert_eq!(second.subtitles_skipped, 1);
        assert_eq!(counters.provider_calls(), 0);
    }

    #[test]
    fn test_dry_run_performs_no_side_effects() {
        let tree = TempTree::new("orchestrator_dry");
        tree.touch("Movie.mkv");
        let mut config = config_for(tree.path().to_path_buf(), &["en"]);
        config.dry_run = true;

        let provider = RecordingProvider::with_match("en", 8.0);
        let counters = provider.counters();
        // Even with a session present, dry-run must not touch it
        let session = ProviderSession::with_providers(vec![Box::new(provider)], 1, 0.0, false);

        let videos = locate_videos(&config.root, false).unwrap();
        let mut would_fetch = 0;
        let summary = process_batch(&config, Some(&session), &videos, &mut |event| {
            if let ProgressEvent::WouldFetch { .. } = event {
                would_fetch += 1;
            }
        });

        assert_eq!(counters.provider_calls(), 0);
        assert_eq!(would_fetch, 1);
        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.subtitles_written, 0);
        assert!(!tree.path().join("Movie.en.srt").exists());
    }

    #[test]
    fn test_dry_run_via_public_entry_point() {
        let tree = TempTree::new("orchestrator_dry_public");
        tree.touch("Movie.mkv");
        let mut config = config_for(tree.path().to_path_buf(), &["en"]);
        config.dry_run = true;

        // No session is ever opened, so this works without any network
        let summary = fetch_subtitles(&config, |_| {}).unwrap();

        assert_eq!(summary.files_processed, 1);
        assert!(!tree.path().join("Movie.en.srt").exists());
    }

    #[test]
    fn test_force_fetches_and_overwrites_existing() {
        let tree = TempTree::new("orchestrator_force");
        tree.touch("Movie.mkv");
        let existing = tree.path().join("Movie.en.srt");
        std::fs::write(&existing, b"stale content").unwrap();

        let mut config = config_for(tree.path().to_path_buf(), &["en"]);
        config.force = true;

        let (summary, counters) =
            run_with_provider(&config, RecordingProvider::with_match("en", 8.0));

        assert_eq!(counters.searches(), 1);
        assert_eq!(summary.subtitles_written, 1);
        assert_eq!(std::fs::read(existing).unwrap(), RECORDED_SUBTITLE);
    }

    #[test]
    fn test_provider_failure_is_recorded_not_fatal() {
        let tree = TempTree::new("orchestrator_failure");
        tree.touch("A.mkv");
        tree.touch("B.mkv");
        let config = config_for(tree.path().to_path_buf(), &["en"]);

        let provider =
            RecordingProvider::with_match("en", 8.0).failing_searches(usize::MAX);
        let (summary, _) = run_with_provider(&config, provider);

        // Both files processed despite every fetch failing
        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.subtitles_written, 0);
    }

    #[test]
    fn test_no_match_counts_as_skip() {
        let tree = TempTree::new("orchestrator_nomatch");
        tree.touch("Movie.mkv");
        let config = config_for(tree.path().to_path_buf(), &["hi"]);

        let (summary, _) = run_with_provider(&config, RecordingProvider::with_match("en", 8.0));

        assert_eq!(
            summary,
            RunSummary {
                files_processed: 1,
                subtitles_written: 0,
                subtitles_skipped: 1,
                errors: 0,
            }
        );
    }

    #[test]
    fn test_bad_root_is_fatal() {
        let config = config_for(PathBuf::from("/nonexistent/sublify/root"), &["en"]);
        let result = fetch_subtitles(&config, |_| {});
        assert!(matches!(result, Err(SublifyError::FileResolver(_))));
    }

    #[test]
    fn test_empty_directory_completes_with_empty_summary() {
        let tree = TempTree::new("orchestrator_empty");
        let config = config_for(tree.path().to_path_buf(), &["en"]);

        // No videos means no session is needed; no network is touched
        let summary = fetch_subtitles(&config, |_| {}).unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
