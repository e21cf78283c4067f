/// OpenSubtitles provider implementation.
use super::opensubtitles_types::{
    OsDownloadResponse, OsLoginResponse, OsSearchResponse, OsSubtitle,
};
use super::{Credentials, ProviderError, SubtitleCandidate, SubtitleProvider};
use crate::file_resolver::{MediaKind, VideoFile};
use crate::language::LanguageTag;

/// Application key identifying this client to the OpenSubtitles API
const API_KEY: &str = "mJ6krEkMGAnvrGyKo7dBBvUTKcySGPaT";

/// Subtitle provider for the OpenSubtitles REST API.
///
/// This provider searches https://api.opensubtitles.com (API v1). Anonymous
/// use is supported with reduced download quotas; logging in with account
/// credentials raises the quota and is required for VIP features.
pub(crate) struct OpenSubtitlesProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Bearer token of a credentialed session, absent in anonymous mode
    token: Option<String>,
}

impl OpenSubtitlesProvider {
    /// Creates a new OpenSubtitles provider instance.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://api.opensubtitles.com/api/v1".to_string(),
            token: None,
        }
    }

    /// Converts an OpenSubtitles record to a search candidate.
    ///
    /// Records without a language or without a downloadable file are
    /// dropped. The score folds the provider's quality signals into one
    /// number: community rating, a trust bonus, and a saturating download
    /// popularity bonus.
    fn convert_candidate(subtitle: OsSubtitle) -> Option<SubtitleCandidate> {
        let attributes = subtitle.attributes;

        let language = attributes
            .language
            .as_deref()
            .and_then(|l| LanguageTag::parse(l).ok())?;
        let file = attributes.files.first()?;

        let popularity = ((attributes.download_count as f32).ln_1p() / 10.0).min(1.0);
        let trust = if attributes.from_trusted { 0.5 } else { 0.0 };
        let score = attributes.ratings + trust + popularity;

        Some(SubtitleCandidate {
            id: file.file_id.to_string(),
            provider: "opensubtitles".to_string(),
            language,
            release: attributes.release.unwrap_or_default(),
            hearing_impaired: attributes.hearing_impaired,
            score,
        })
    }

    /// Builds a request with the headers every API call needs.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("Api-Key", API_KEY)
            .header("User-Agent", concat!("sublify v", env!("CARGO_PKG_VERSION")));

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        builder
    }
}

impl SubtitleProvider for OpenSubtitlesProvider {
    fn name(&self) -> &'static str {
        "opensubtitles"
    }

    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        // Anonymous mode needs no session; the API key alone is enough
        let credentials = match credentials {
            Some(c) => c,
            None => return Ok(()),
        };

        let url = format!("{}/login", self.base_url);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Authentication {
                provider: "opensubtitles",
                reason: format!("login rejected for user '{}'", credentials.username),
            });
        }

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "HTTP {} from /login",
                response.status().as_u16()
            )));
        }

        let login: OsLoginResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        self.token = Some(login.token);
        Ok(())
    }

    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        let url = format!("{}/subtitles", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("query", video.stem()),
            ("languages", language.to_query_form()),
        ];

        if let MediaKind::Episode { season, episode } = video.kind {
            query.push(("season_number", season.to_string()));
            query.push(("episode_number", episode.to_string()));
        }

        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&query)
            .send()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "HTTP {} from /subtitles",
                response.status().as_u16()
            )));
        }

        let search: OsSearchResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(search
            .data
            .into_iter()
            .filter_map(Self::convert_candidate)
            // The API matches on the primary subtag; keep only exact tags
            .filter(|c| c.language == *language)
            .collect())
    }

    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        let file_id: u64 = candidate
            .id
            .parse()
            .map_err(|_| ProviderError::Parse(format!("invalid file id '{}'", candidate.id)))?;

        // First mint a short-lived download link for the file
        let url = format!("{}/download", self.base_url);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "HTTP {} from /download",
                response.status().as_u16()
            )));
        }

        let download: OsDownloadResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        // Then fetch the subtitle content itself
        let content = self
            .client
            .get(&download.link)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .bytes()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(content.to_vec())
    }

    fn close(&mut self) {
        // Invalidate the bearer token server-side; ignore failures, the
        // token expires on its own
        if let Some(_token) = self.token.take() {
            let url = format!("{}/logout", self.base_url);
            let _ = self.request(reqwest::Method::DELETE, &url).send();
        }
    }
}
