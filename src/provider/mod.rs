//! Subtitle provider backends
//!
//! This module provides the capability trait all subtitle backends
//! implement, the closed set of known providers, and the shared data types
//! for search results and credentials. Backends only search and download;
//! choosing among candidates is the session's job.

mod cached;
mod opensubtitles;
mod opensubtitles_types;
mod podnapisi;
mod tvsubtitles;

pub(crate) use cached::CachedProvider;
pub(crate) use opensubtitles::OpenSubtitlesProvider;
pub(crate) use podnapisi::PodnapisiProvider;
pub(crate) use tvsubtitles::TvSubtitlesProvider;

use crate::file_resolver::VideoFile;
use crate::language::LanguageTag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to a subtitle provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the supplied credentials
    #[error("Authentication rejected by {provider}: {reason}")]
    Authentication {
        provider: &'static str,
        reason: String,
    },

    /// Request to the provider failed; transient and worth retrying
    #[error("Request failed: {0}")]
    Request(String),

    /// Failed to parse the provider's response
    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Request(_))
    }
}

/// Optional provider account credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A single subtitle search hit reported by a provider
///
/// The score is computed by the backend from its own quality signals
/// (download counts, ratings, uploader trust); the orchestration layer only
/// ever compares scores against the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    /// Provider-scoped download identifier
    pub id: String,
    /// Name of the provider that produced this candidate
    pub provider: String,
    /// Language of the subtitle track
    pub language: LanguageTag,
    /// Release name the subtitle was authored for, if reported
    pub release: String,
    /// Whether the track is authored for hearing-impaired viewers
    pub hearing_impaired: bool,
    /// Provider-reported match quality
    pub score: f32,
}

/// Capability interface every subtitle backend implements
///
/// The set of implementations is closed: one per `ProviderKind` variant,
/// selected by the run's provider allow-list.
pub(crate) trait SubtitleProvider {
    /// Stable provider name, as used on the command line
    fn name(&self) -> &'static str;

    /// Establishes a provider session
    ///
    /// Called once before any search. With credentials, a rejected login is
    /// an `Authentication` error; without credentials the backend operates
    /// anonymously, typically with reduced rate limits.
    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<(), ProviderError>;

    /// Searches for subtitle candidates for one video in one language
    ///
    /// An empty result means the provider has no match; that is not an
    /// error. Candidates report whether they are hearing-impaired tracks;
    /// weighing that against the run's preference is the session's job.
    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError>;

    /// Downloads the subtitle content for a candidate previously returned
    /// by `search`
    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError>;

    /// Releases provider-side session resources
    ///
    /// Best effort; called exactly once when the session closes.
    fn close(&mut self) {}
}

impl SubtitleProvider for Box<dyn SubtitleProvider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        (**self).authenticate(credentials)
    }

    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        (**self).search(video, language)
    }

    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        (**self).download(candidate)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// The closed set of supported subtitle providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenSubtitles,
    Podnapisi,
    TvSubtitles,
}

impl ProviderKind {
    /// The default provider set used when none is configured
    pub fn baseline() -> Vec<ProviderKind> {
        vec![
            ProviderKind::OpenSubtitles,
            ProviderKind::Podnapisi,
            ProviderKind::TvSubtitles,
        ]
    }

    /// The provider's command-line name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenSubtitles => "opensubtitles",
            ProviderKind::Podnapisi => "podnapisi",
            ProviderKind::TvSubtitles => "tvsubtitles",
        }
    }

    /// Parses a provider name as given on the command line
    pub fn parse(name: &str) -> Result<ProviderKind, String> {
        match name.to_ascii_lowercase().as_str() {
            "opensubtitles" => Ok(ProviderKind::OpenSubtitles),
            "podnapisi" => Ok(ProviderKind::Podnapisi),
            "tvsubtitles" => Ok(ProviderKind::TvSubtitles),
            other => Err(format!(
                "Unknown provider '{}'. Valid providers: opensubtitles, podnapisi, tvsubtitles",
                other
            )),
        }
    }

    /// Instantiates the backend for this provider
    pub(crate) fn instantiate(&self) -> Box<dyn SubtitleProvider> {
        match self {
            ProviderKind::OpenSubtitles => Box::new(OpenSubtitlesProvider::new()),
            ProviderKind::Podnapisi => Box::new(PodnapisiProvider::new()),
            ProviderKind::TvSubtitles => Box::new(TvSubtitlesProvider::new()),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_providers() {
        assert_eq!(
            ProviderKind::parse("opensubtitles").unwrap(),
            ProviderKind::OpenSubtitles
        );
        assert_eq!(
            ProviderKind::parse("Podnapisi").unwrap(),
            ProviderKind::Podnapisi
        );
        assert_eq!(
            ProviderKind::parse("TVSUBTITLES").unwrap(),
            ProviderKind::TvSubtitles
        );
    }

    #[test]
    fn test_parse_unknown_provider_lists_valid_set() {
        let err = ProviderKind::parse("subscene").unwrap_err();
        assert!(err.contains("subscene"));
        assert!(err.contains("opensubtitles"));
    }

    #[test]
    fn test_baseline_set_matches_defaults() {
        let names: Vec<&str> = ProviderKind::baseline().iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["opensubtitles", "podnapisi", "tvsubtitles"]);
    }

    #[test]
    fn test_rejected_credentials_surface_as_authentication_error() {
        let mut provider = crate::test_support::RecordingProvider::new().rejecting_auth();
        let counters = provider.counters();

        let credentials = Credentials {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        let error = provider.authenticate(Some(&credentials)).unwrap_err();

        assert!(matches!(error, ProviderError::Authentication { .. }));
        assert!(!error.is_transient());
        assert_eq!(counters.authenticates(), 1);
    }
}
