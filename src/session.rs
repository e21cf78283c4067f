//! Provider session
//!
//! A session owns the configured subtitle backends for the duration of one
//! run: it authenticates them at open, answers fetch requests for one video
//! at a time, and releases provider-side resources on every exit path via
//! `Drop`.

use crate::RunConfiguration;
use crate::cache::CacheStorage;
use crate::file_resolver::VideoFile;
use crate::language::LanguageTag;
use crate::provider::{
    CachedProvider, ProviderError, SubtitleCandidate, SubtitleProvider,
};
use std::time::Duration;
use thiserror::Error;

/// How long cached provider search results stay fresh
const SEARCH_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors that can occur while opening a provider session
#[derive(Debug, Error)]
pub enum SessionError {
    /// A provider rejected the supplied credentials
    #[error("{0}")]
    Authentication(ProviderError),

    /// Every configured provider failed to come up
    #[error("No usable subtitle providers: {0}")]
    NoProviders(String),
}

/// One fetch request: a video and the residual languages it still needs
#[derive(Debug)]
pub struct FetchRequest<'a> {
    pub video: &'a VideoFile,
    pub languages: &'a [LanguageTag],
}

/// Per-language outcome of a fetch
#[derive(Debug)]
pub enum FetchResult {
    /// A subtitle was found and downloaded
    Found {
        language: LanguageTag,
        provider: String,
        score: f32,
        content: Vec<u8>,
    },
    /// No provider had an acceptable match
    NotFound { language: LanguageTag },
    /// Every attempt for this language failed
    Failed { language: LanguageTag, error: String },
}

/// A configured connection to the subtitle provider backends
///
/// The session lives for the whole run. Opening authenticates every
/// allow-listed backend; dropping the session logs out of them. Fetching is
/// strictly sequential, one request at a time.
pub struct ProviderSession {
    providers: Vec<Box<dyn SubtitleProvider>>,
    /// Providers that failed to come up transiently, with the reason
    skipped: Vec<(String, String)>,
    retries: u32,
    min_score: f32,
    prefer_hearing_impaired: bool,
    closed: bool,
}

impl ProviderSession {
    /// Opens a session against the configured providers
    ///
    /// Each backend is instantiated, wrapped in the search cache and
    /// authenticated once. A rejection of explicitly supplied credentials
    /// is fatal. A backend failing for transient reasons is skipped (see
    /// [`skipped_providers`](Self::skipped_providers)); losing every
    /// backend is fatal too.
    pub fn open(config: &RunConfiguration) -> Result<Self, SessionError> {
        let mut providers: Vec<Box<dyn SubtitleProvider>> = Vec::new();
        let mut skipped: Vec<(String, String)> = Vec::new();

        for kind in &config.providers {
            let mut backend = Self::build_provider(kind.instantiate());

            match backend.authenticate(config.credentials.as_ref()) {
                Ok(()) => providers.push(backend),
                Err(error @ ProviderError::Authentication { .. })
                    if config.credentials.is_some() =>
                {
                    return Err(SessionError::Authentication(error));
                }
                Err(error) => skipped.push((kind.to_string(), error.to_string())),
            }
        }

        if providers.is_empty() {
            let detail = skipped
                .iter()
                .map(|(name, error)| format!("{} ({})", name, error))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SessionError::NoProviders(detail));
        }

        Ok(Self {
            providers,
            skipped,
            retries: config.retries,
            min_score: config.min_score,
            prefer_hearing_impaired: config.hearing_impaired,
            closed: false,
        })
    }

    /// Wraps a backend in the persistent search cache when available
    ///
    /// A machine without a usable cache directory still works; searches
    /// just go to the provider every time.
    fn build_provider(backend: Box<dyn SubtitleProvider>) -> Box<dyn SubtitleProvider> {
        match CacheStorage::open("searches", Some(SEARCH_CACHE_TTL)) {
            Ok(cache) => Box::new(CachedProvider::new(backend, cache)),
            Err(_) => backend,
        }
    }

    /// Creates a session directly from backends, bypassing authentication
    #[cfg(test)]
    pub(crate) fn with_providers(
        providers: Vec<Box<dyn SubtitleProvider>>,
        retries: u32,
        min_score: f32,
        prefer_hearing_impaired: bool,
    ) -> Self {
        Self {
            providers,
            skipped: Vec::new(),
            retries,
            min_score,
            prefer_hearing_impaired,
            closed: false,
        }
    }

    /// Providers that were configured but dropped at open, with reasons
    pub fn skipped_providers(&self) -> &[(String, String)] {
        &self.skipped
    }

    /// Fetches subtitles for one video, one result per requested language
    ///
    /// Results come back in request order. Failures are contained to their
    /// language; a provider outage shows up as `Failed` entries, never as a
    /// panic or an early return.
    pub fn fetch(&self, request: &FetchRequest<'_>) -> Vec<FetchResult> {
        request
            .languages
            .iter()
            .map(|language| self.fetch_language(request.video, language))
            .collect()
    }

    /// Resolves a single language for a video
    fn fetch_language(&self, video: &VideoFile, language: &LanguageTag) -> FetchResult {
        let mut candidates: Vec<SubtitleCandidate> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut any_search_succeeded = false;

        for provider in &self.providers {
            match self.with_retry(|| provider.search(video, language)) {
                Ok(found) => {
                    any_search_succeeded = true;
                    candidates.extend(found);
                }
                Err(error) => errors.push(format!("{}: {}", provider.name(), error)),
            }
        }

        if !any_search_succeeded {
            return FetchResult::Failed {
                language: language.clone(),
                error: errors.join("; "),
            };
        }

        // Selection: honor the hearing-impaired preference first, then the
        // provider-reported score; candidates below the threshold are out
        candidates.retain(|c| c.score >= self.min_score);
        candidates.sort_by(|a, b| {
            let a_preferred = a.hearing_impaired == self.prefer_hearing_impaired;
            let b_preferred = b.hearing_impaired == self.prefer_hearing_impaired;
            b_preferred
                .cmp(&a_preferred)
                .then(b.score.total_cmp(&a.score))
        });

        if candidates.is_empty() {
            return FetchResult::NotFound {
                language: language.clone(),
            };
        }

        // Download the best candidate, falling back down the ranking when a
        // download persistently fails
        for candidate in &candidates {
            let Some(provider) = self.provider_by_name(&candidate.provider) else {
                continue;
            };

            match self.with_retry(|| provider.download(candidate)) {
                Ok(content) => {
                    return FetchResult::Found {
                        language: language.clone(),
                        provider: candidate.provider.clone(),
                        score: candidate.score,
                        content,
                    };
                }
                Err(error) => errors.push(format!("{}: {}", candidate.provider, error)),
            }
        }

        FetchResult::Failed {
            language: language.clone(),
            error: errors.join("; "),
        }
    }

    fn provider_by_name(&self, name: &str) -> Option<&dyn SubtitleProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Runs an operation, retrying transient failures up to the configured
    /// retry count
    fn with_retry<T>(
        &self,
        mut operation: impl FnMut() -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.retries => {
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Releases provider-side resources; harmless to call twice
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for provider in &mut self.providers {
            provider.close();
        }
    }
}

impl Drop for ProviderSession {
    fn drop(&mut self) {
        self.close();
    }
}
