/// OpenSubtitles REST API response types for deserialization.
///
/// These structures mirror the JSON response format of api.opensubtitles.com
/// (API v1), reduced to the fields the backend actually consumes. Unknown
/// fields are ignored; optional fields default so a sparse record never
/// fails the whole search.
use serde::Deserialize;

/// Response of the `/login` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct OsLoginResponse {
    /// JWT bearer token for the authenticated session
    pub token: String,
}

/// Paged response of the `/subtitles` search endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct OsSearchResponse {
    pub data: Vec<OsSubtitle>,
}

/// A single subtitle record.
#[derive(Debug, Deserialize)]
pub(super) struct OsSubtitle {
    pub attributes: OsAttributes,
}

/// The attributes of a subtitle record.
#[derive(Debug, Deserialize)]
pub(super) struct OsAttributes {
    /// Subtitle language tag (may be absent on malformed records)
    pub language: Option<String>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub hearing_impaired: bool,
    #[serde(default)]
    pub from_trusted: bool,
    /// Community rating, 0.0 to 10.0
    #[serde(default)]
    pub ratings: f32,
    /// Release name the subtitle was synced against
    pub release: Option<String>,
    /// Downloadable files; the first entry is the subtitle itself
    #[serde(default)]
    pub files: Vec<OsFile>,
}

/// A downloadable file attached to a subtitle record.
#[derive(Debug, Deserialize)]
pub(super) struct OsFile {
    pub file_id: u64,
}

/// Response of the `/download` endpoint: a short-lived direct link.
#[derive(Debug, Deserialize)]
pub(super) struct OsDownloadResponse {
    pub link: String,
}
