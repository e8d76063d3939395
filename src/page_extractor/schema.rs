use serde::{Deserialize, Serialize};

use super::extractors::normalize_whitespace;

/// Metadata returned for one scraped page
///
/// String fields are always whitespace-normalized and empty when the page
/// does not provide them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub meta_description: String,
    pub h1: String,
    pub status: u16,
}

/// Unprocessed fields as returned by the metadata script
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawPageFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_description: Option<String>,
    pub h1: Option<String>,
}

impl RawPageFields {
    /// Description fallback chain: `meta[name=description]`, then
    /// `og:description`, then empty. A blank tag counts as missing.
    #[must_use]
    pub fn description(&self) -> String {
        [self.description.as_deref(), self.og_description.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize_whitespace)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    /// Sanitize every field and attach the navigation status
    #[must_use]
    pub fn into_metadata(self, status: u16) -> PageMetadata {
        let meta_description = self.description();
        PageMetadata {
            title: self.title.as_deref().map(normalize_whitespace).unwrap_or_default(),
            meta_description,
            h1: self.h1.as_deref().map(normalize_whitespace).unwrap_or_default(),
            status,
        }
    }
}
