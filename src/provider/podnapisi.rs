/// Podnapisi provider implementation.
use super::{Credentials, ProviderError, SubtitleCandidate, SubtitleProvider};
use crate::file_resolver::{MediaKind, VideoFile};
use crate::language::LanguageTag;
use serde::Deserialize;

/// Subtitle provider for the Podnapisi.NET advanced search API.
///
/// Podnapisi serves its advanced search as JSON when asked for it via the
/// Accept header; no account is needed for searching or downloading, so
/// `authenticate` is a no-op.
pub(crate) struct PodnapisiProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

/// Search response of `/subtitles/search/advanced`.
#[derive(Debug, Deserialize)]
struct PnSearchResponse {
    data: Vec<PnSubtitle>,
}

/// A single Podnapisi subtitle entry, reduced to the fields we consume.
#[derive(Debug, Deserialize)]
struct PnSubtitle {
    language: Option<String>,
    /// Relative download path for the subtitle content
    download: String,
    /// Release names; occasionally carry HTML entities or markup
    #[serde(default)]
    custom_releases: Vec<String>,
    /// Attribute flags such as "hearing_impaired"
    #[serde(default)]
    flags: Vec<String>,
    /// Community rating, 0.0 to 5.0
    #[serde(default)]
    rating: f32,
    #[serde(default)]
    stats: PnStats,
}

#[derive(Debug, Default, Deserialize)]
struct PnStats {
    #[serde(default)]
    downloads: u64,
}

impl PodnapisiProvider {
    /// Creates a new Podnapisi provider instance.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://www.podnapisi.net".to_string(),
        }
    }

    /// Converts a Podnapisi entry to a search candidate.
    ///
    /// The 0-5 community rating is scaled onto the common 0-10 range, with
    /// a saturating download popularity bonus on top.
    fn convert_candidate(subtitle: PnSubtitle) -> Option<SubtitleCandidate> {
        let language = subtitle
            .language
            .as_deref()
            .and_then(|l| LanguageTag::parse(l).ok())?;

        let release = subtitle
            .custom_releases
            .first()
            .map(|r| nanohtml2text::html2text(r).trim().to_string())
            .unwrap_or_default();

        let popularity = ((subtitle.stats.downloads as f32).ln_1p() / 10.0).min(1.0);
        let score = subtitle.rating * 2.0 + popularity;

        Some(SubtitleCandidate {
            // The download path is everything needed to fetch the content
            id: subtitle.download,
            provider: "podnapisi".to_string(),
            language,
            release,
            hearing_impaired: subtitle.flags.iter().any(|f| f == "hearing_impaired"),
            score,
        })
    }
}

impl SubtitleProvider for PodnapisiProvider {
    fn name(&self) -> &'static str {
        "podnapisi"
    }

    fn authenticate(&mut self, _credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        // Podnapisi search and download are open; credentials are only
        // meaningful for uploads, which we never do
        Ok(())
    }

    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        let url = format!("{}/subtitles/search/advanced", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("keywords", video.stem()),
            ("language", language.to_query_form()),
        ];

        match video.kind {
            MediaKind::Episode { season, episode } => {
                query.push(("seasons", season.to_string()));
                query.push(("episodes", episode.to_string()));
                query.push(("movie_type", "tv-series".to_string()));
            }
            MediaKind::Movie => {
                query.push(("movie_type", "movie".to_string()));
            }
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "HTTP {} from advanced search",
                response.status().as_u16()
            )));
        }

        let search: PnSearchResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(search
            .data
            .into_iter()
            .filter_map(Self::convert_candidate)
            .filter(|c| c.language.primary() == language.primary())
            .collect())
    }

    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}{}", self.base_url, candidate.id);

        let content = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .bytes()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(content.to_vec())
    }
}
