//! Shared helpers for unit tests
//!
//! Provides unique temporary directory trees and a recording subtitle
//! provider double for call-count assertions against the orchestrator and
//! session.

use crate::language::LanguageTag;
use crate::provider::{Credentials, ProviderError, SubtitleCandidate, SubtitleProvider};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Subtitle body returned by every `RecordingProvider` download
pub(crate) const RECORDED_SUBTITLE: &[u8] = b"1\n00:00:01,000 --> 00:00:02,000\nHello.\n";

static TREE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A uniquely named temporary directory tree, removed on drop
pub(crate) struct TempTree {
    root: PathBuf,
}

impl TempTree {
    pub fn new(label: &str) -> Self {
        let unique = TREE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "sublify_test_{}_{}_{}",
            label,
            std::process::id(),
            unique
        ));
        fs::create_dir_all(&root).expect("failed to create temp tree");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates an empty file at the given relative path, with parents
    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories");
        }
        fs::write(&path, b"").expect("failed to create file");
        path
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Call counters shared between a `RecordingProvider` and the test body
#[derive(Clone, Default)]
pub(crate) struct CallCounters {
    searches: Arc<AtomicUsize>,
    downloads: Arc<AtomicUsize>,
    authenticates: Arc<AtomicUsize>,
}

impl CallCounters {
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::Relaxed)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::Relaxed)
    }

    pub fn authenticates(&self) -> usize {
        self.authenticates.load(Ordering::Relaxed)
    }

    pub fn provider_calls(&self) -> usize {
        self.searches() + self.downloads()
    }
}

/// A scripted subtitle provider for tests
///
/// Returns preconfigured candidates, counts every call, and can be told to
/// fail its first N searches (transient) or to reject authentication.
pub(crate) struct RecordingProvider {
    candidates: Vec<SubtitleCandidate>,
    counters: CallCounters,
    failing_searches: AtomicUsize,
    reject_auth: bool,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            counters: CallCounters::default(),
            failing_searches: AtomicUsize::new(0),
            reject_auth: false,
        }
    }

    /// A provider holding one candidate for the given language
    pub fn with_match(language: &str, score: f32) -> Self {
        let mut provider = Self::new();
        provider
            .candidates
            .push(Self::candidate(language, score, false));
        provider
    }

    /// A provider holding the given candidates
    pub fn with_candidates(candidates: Vec<SubtitleCandidate>) -> Self {
        let mut provider = Self::new();
        provider.candidates = candidates;
        provider
    }

    /// Makes the first `count` search calls fail with a transient error
    pub fn failing_searches(mut self, count: usize) -> Self {
        self.failing_searches = AtomicUsize::new(count);
        self
    }

    /// Makes authentication fail with a credential rejection
    pub fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    /// A handle onto this provider's call counters
    pub fn counters(&self) -> CallCounters {
        self.counters.clone()
    }

    /// Builds a candidate the way this double reports them
    pub fn candidate(language: &str, score: f32, hearing_impaired: bool) -> SubtitleCandidate {
        SubtitleCandidate {
            id: format!("rec-{}", language),
            provider: "recording".to_string(),
            language: LanguageTag::parse(language).expect("invalid test language"),
            release: "Recorded.Release.1080p".to_string(),
            hearing_impaired,
            score,
        }
    }
}

impl SubtitleProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        self.counters.authenticates.fetch_add(1, Ordering::Relaxed);

        if self.reject_auth {
            return Err(ProviderError::Authentication {
                provider: "recording",
                reason: format!(
                    "login rejected for user '{}'",
                    credentials.map(|c| c.username.as_str()).unwrap_or("")
                ),
            });
        }

        Ok(())
    }

    fn search(
        &self,
        _video: &crate::file_resolver::VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        self.counters.searches.fetch_add(1, Ordering::Relaxed);

        let remaining = self.failing_searches.load(Ordering::Relaxed);
        if remaining > 0 {
            self.failing_searches.store(remaining - 1, Ordering::Relaxed);
            return Err(ProviderError::Request("scripted failure".to_string()));
        }

        Ok(self
            .candidates
            .iter()
            .filter(|c| c.language == *language)
            .cloned()
            .collect())
    }

    fn download(&self, _candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        self.counters.downloads.fetch_add(1, Ordering::Relaxed);
        Ok(RECORDED_SUBTITLE.to_vec())
    }
}
