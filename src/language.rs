//! Language tags and request language sets
//!
//! This module provides the language identifiers used throughout the fetch
//! pipeline: a validated language tag (ISO 639-1 style, with an optional
//! BCP-47 region like `pt-BR`) and an ordered, de-duplicated set of tags
//! representing the languages requested for a run.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing language tags
#[derive(Debug, Error)]
pub enum LanguageError {
    /// The tag does not follow the `xx` / `xxx` / `xx-YY` form
    #[error("Invalid language tag: {0}")]
    InvalidTag(String),
}

/// A validated language tag such as `en`, `hi` or `pt-BR`
///
/// The primary subtag is stored lowercase and the optional region subtag
/// uppercase, so that `PT-br`, `pt_BR` and `pt-BR` all canonicalize to the
/// same tag. The `Display` form is the canonical form and is also the suffix
/// used in subtitle file names (`Movie.pt-BR.srt`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LanguageTag {
    primary: String,
    region: Option<String>,
}

impl LanguageTag {
    /// Parses a language tag from its textual form
    ///
    /// Accepts a two- or three-letter primary subtag, optionally followed by
    /// a two-letter region subtag separated by `-` or `_`. Validation is
    /// purely structural; whether a provider actually carries the language is
    /// the provider's concern.
    pub fn parse(input: &str) -> Result<Self, LanguageError> {
        let mut parts = input.split(['-', '_']);

        let primary = parts.next().unwrap_or_default();
        let region = parts.next();

        // Anything beyond primary + region is not a tag we understand
        if parts.next().is_some() {
            return Err(LanguageError::InvalidTag(input.to_string()));
        }

        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LanguageError::InvalidTag(input.to_string()));
        }

        let region = match region {
            None => None,
            Some(r) if r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(r.to_ascii_uppercase())
            }
            Some(_) => return Err(LanguageError::InvalidTag(input.to_string())),
        };

        Ok(Self {
            primary: primary.to_ascii_lowercase(),
            region,
        })
    }

    /// Returns the lowercase primary subtag (`pt` for `pt-BR`)
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Returns the tag in the lowercase `xx-yy` form some provider APIs expect
    pub fn to_query_form(&self) -> String {
        match &self.region {
            Some(region) => format!("{}-{}", self.primary, region.to_ascii_lowercase()),
            None => self.primary.clone(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.primary, region),
            None => write!(f, "{}", self.primary),
        }
    }
}

impl FromStr for LanguageTag {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An ordered, de-duplicated collection of language tags
///
/// Order is the order languages were requested in; duplicates collapse onto
/// their first occurrence. The set is immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    tags: Vec<LanguageTag>,
}

impl LanguageSet {
    /// Builds a language set from the requested tags, collapsing duplicates
    pub fn new<I>(tags: I) -> Self
    where
        I: IntoIterator<Item = LanguageTag>,
    {
        let mut unique: Vec<LanguageTag> = Vec::new();

        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        Self { tags: unique }
    }

    /// Iterates the tags in request order
    pub fn iter(&self) -> impl Iterator<Item = &LanguageTag> {
        self.tags.iter()
    }

    pub fn contains(&self, tag: &LanguageTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.tags {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
            first = false;
        }
        Ok(())
    }
}
