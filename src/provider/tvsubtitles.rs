/// TVSubtitles provider implementation.
use super::{Credentials, ProviderError, SubtitleCandidate, SubtitleProvider};
use crate::file_resolver::{MediaKind, VideoFile};
use crate::language::LanguageTag;

/// Base score for TVSubtitles candidates
///
/// The site exposes no rating signal, so every candidate gets the same
/// modest score and loses ties against rated candidates from other
/// providers.
const BASE_SCORE: f32 = 6.0;

/// Subtitle provider for tvsubtitles.net.
///
/// TVSubtitles is an HTML-only site organized show -> season -> episode, so
/// this backend walks three pages per search using lightweight string
/// extraction. It only carries TV episodes; movie queries yield no
/// candidates.
pub(crate) struct TvSubtitlesProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl TvSubtitlesProvider {
    /// Creates a new TVSubtitles provider instance.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://www.tvsubtitles.net".to_string(),
        }
    }

    /// Fetches a page and returns its body as text.
    fn get_page(&self, path: &str) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .text()
            .map_err(|e| ProviderError::Request(e.to_string()))
    }

    /// Derives the show title part of an episode file stem.
    ///
    /// Everything before the `SxxEyy` token, with separators normalized to
    /// spaces: `The.Wire.S03E04.720p` becomes `The Wire`.
    fn show_title(stem: &str) -> String {
        let lowered = stem.to_ascii_lowercase();
        let cut = lowered
            .char_indices()
            .find(|&(i, c)| {
                (c == 's' || c == 'S')
                    && lowered[i + c.len_utf8()..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit())
            })
            .map(|(i, _)| i)
            .unwrap_or(stem.len());

        stem[..cut]
            .replace(['.', '_', '-'], " ")
            .trim()
            .to_string()
    }

    /// Finds the show id for a title via the search page.
    fn find_show_id(&self, title: &str) -> Result<Option<u32>, ProviderError> {
        let url = format!("{}/search.php", self.base_url);
        let page = self
            .client
            .post(&url)
            .form(&[("q", title)])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .text()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(extract_id(&page, "href=\"/tvshow-"))
    }

    /// Finds the episode id on a season listing page.
    fn find_episode_id(
        &self,
        show_id: u32,
        season: u32,
        episode: u32,
    ) -> Result<Option<u32>, ProviderError> {
        let page = self.get_page(&format!("tvshow-{}-{}.html", show_id, season))?;

        // Episode rows are numbered like "3x04"; locate the row, then the
        // episode link inside it
        let row_marker = format!("{}x{:02}", season, episode);
        let Some(row_start) = page.find(&row_marker) else {
            return Ok(None);
        };

        Ok(extract_id(&page[row_start..], "href=\"episode-"))
    }
}

impl SubtitleProvider for TvSubtitlesProvider {
    fn name(&self) -> &'static str {
        "tvsubtitles"
    }

    fn authenticate(&mut self, _credentials: Option<&Credentials>) -> Result<(), ProviderError> {
        // TVSubtitles has no account concept for downloads
        Ok(())
    }

    fn search(
        &self,
        video: &VideoFile,
        language: &LanguageTag,
    ) -> Result<Vec<SubtitleCandidate>, ProviderError> {
        let MediaKind::Episode { season, episode } = video.kind else {
            return Ok(Vec::new());
        };

        let title = Self::show_title(&video.stem());
        if title.is_empty() {
            return Ok(Vec::new());
        }

        let Some(show_id) = self.find_show_id(&title)? else {
            return Ok(Vec::new());
        };

        let Some(episode_id) = self.find_episode_id(show_id, season, episode)? else {
            return Ok(Vec::new());
        };

        // The per-language episode page lists one subtitle entry per release
        let page = self.get_page(&format!(
            "episode-{}-{}.html",
            episode_id,
            language.primary()
        ))?;

        let candidates = extract_all_ids(&page, "href=\"/subtitle-")
            .into_iter()
            .map(|(subtitle_id, anchor_text)| SubtitleCandidate {
                id: subtitle_id.to_string(),
                provider: "tvsubtitles".to_string(),
                language: language.clone(),
                release: nanohtml2text::html2text(&anchor_text).trim().to_string(),
                hearing_impaired: false,
                score: BASE_SCORE,
            })
            .collect();

        Ok(candidates)
    }

    fn download(&self, candidate: &SubtitleCandidate) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/download-{}.html", self.base_url, candidate.id);

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

/// Extracts the first numeric id following `marker` in `page`.
fn extract_id(page: &str, marker: &str) -> Option<u32> {
    let start = page.find(marker)? + marker.len();
    let digits: String = page[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Extracts every (id, anchor text) pair for links matching `marker`.
fn extract_all_ids(page: &str, marker: &str) -> Vec<(u32, String)> {
    let mut results = Vec::new();
    let mut rest = page;

    while let Some(pos) = rest.find(marker) {
        let after = &rest[pos + marker.len()..];

        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(id) = digits.parse::<u32>() {
            // Anchor text runs from the closing '>' to the next '<'
            let text = after
                .find('>')
                .map(|gt| {
                    let tail = &after[gt + 1..];
                    tail[..tail.find('<').unwrap_or(tail.len())].to_string()
                })
                .unwrap_or_default();
            results.push((id, text));
        }

        rest = after;
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_title_from_stem() {
        assert_eq!(
            TvSubtitlesProvider::show_title("The.Wire.S03E04.720p.WEB"),
            "The Wire"
        );
        assert_eq!(
            TvSubtitlesProvider::show_title("breaking bad s01e01"),
            "breaking bad"
        );
    }

    #[test]
    fn test_extract_id() {
        let page = r#"<a href="/tvshow-911-3.html">The Wire</a>"#;
        assert_eq!(extract_id(page, "href=\"/tvshow-"), Some(911));
        assert_eq!(extract_id(page, "href=\"/episode-"), None);
    }

    #[test]
    fn test_extract_all_ids_with_anchor_text() {
        let page = concat!(
            r#"<a href="/subtitle-100.html">Wire.S03E04.HDTV</a>"#,
            r#"<a href="/subtitle-101.html">Wire.S03E04.WEB</a>"#,
        );

        let ids = extract_all_ids(page, "href=\"/subtitle-");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], (100, "Wire.S03E04.HDTV".to_string()));
        assert_eq!(ids[1].0, 101);
    }

    #[test]
    fn test_movie_queries_yield_nothing() {
        let provider = TvSubtitlesProvider::new();
        let video = crate::file_resolver::VideoFile::new(std::path::PathBuf::from(
            "/media/Inception (2010).mkv",
        ));

        let language = LanguageTag::parse("en").unwrap();
        let candidates = provider.search(&video, &language).unwrap();
        assert!(candidates.is_empty());
    }
}
