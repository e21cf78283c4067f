//! Cached provider implementation
//!
//! This module provides a caching wrapper for subtitle providers that
//! stores search results in the local cache storage, so repeated runs over
//! the same library do not hammer provider search endpoints. Downloads are
//! never cached; content is fetched fresh exactly when it will be written.

use super::{Credentials, ProviderError, SubtitleCandidate, SubtitleProvider};
use crate::cache::CacheStorage;
use crate::file_resolver::VideoFile;
use crate::language::LanguageTag;

/// A caching wrapper for subtitle providers
///
/// This provider wraps another subtitle provider and caches its search
/// results. The cache is persistent across application runs; entries expire
/// after the TTL configured on the storage. Cache failures of any kind
/// degrade to querying the wrapped provider.
pub(crate) struct CachedProvider<P>
where
    P: SubtitleProvider,
{
    /// The underlying subtitle provider
    provider: P,
    /// Cache storage for search results
    cache: CacheStorage<Vec<SubtitleCandidate>>,
}

impl<P> CachedProvider<P>
where
    P: SubtitleProvider,
{
    /// Creates a new cached provider wrapping the given provider
    pub fn new(provider: P, cache: CacheStorage<Vec<SubtitleCandidate>>) -> Self {
        Self { provider, cache }
    }

    /// Generates a cache key for a search query
    ///
    /// The key combines the provider name, the video's file stem and the
    /// language so different queries are cached separately.
    fn cache_key(&self, video: &VideoFile, language: &LanguageTag) -> String {
        format!("{}:{}:{}", self.provider.name(), video.stem(), language)
    }
}

impl<P> SubtitleProvider for CachedProvider<P>
where
    P: SubtitleProvider,
{
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        self.provider.authenticate(credentials)
    }

    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        let cache_key = self.cache_key(video, language);

        match self.cache.load(&cache_key) {
            Ok(Some(candidates)) => {
                // Cache hit - no provider round trip
                return Ok(candidates);
            }
            Ok(None) => {
                // Cache miss - continue to search the provider
            }
            Err(_) => {
                // Cache read error - continue to search the provider.
                // A broken cache must never block a fetch.
            }
        }

        let candidates = self.provider.search(video, language)?;

        // Store in cache (ignore errors to avoid failing the search)
        let _ = self.cache.store(&cache_key, &candidates);

        Ok(candidates)
    }

    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        self.provider.download(candidate)
    }

    fn close(&mut self) {
        self.provider.close();
    }
}
