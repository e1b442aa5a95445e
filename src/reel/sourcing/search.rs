use async_trait::async_trait;
use thiserror::Error;

use crate::reel::types::{MediaKind, Orientation};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no media search API key configured (set PEXELS_API_KEY or search.api_key)")]
    MissingApiKey,

    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub kind: MediaKind,
    pub orientation: Orientation,
    pub per_page: u32,
    /// 1-based result page
    pub page: u32,
}

/// One result returned by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Clip length in seconds; `None` for stills
    pub duration: Option<f64>,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait MediaSearch: Send + Sync {
    /// Ordered results for one page of `request`
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError>;
}

/// Client-side filter applied to every page of results.
#[derive(Debug, Clone)]
pub struct HitFilter {
    pub orientation: Orientation,
    pub kind: MediaKind,
    /// Lowercased substrings; a clip whose tags contain any of them is dropped
    pub exclude_tags: Vec<String>,
}

impl HitFilter {
    pub fn new(orientation: Orientation, kind: MediaKind, exclude_tags: &[String]) -> Self {
        Self {
            orientation,
            kind,
            exclude_tags: exclude_tags
                .iter()
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect(),
        }
    }

    pub fn accepts(&self, hit: &SearchHit) -> bool {
        if hit.url.trim().is_empty() || !self.orientation.matches(hit.width, hit.height) {
            return false;
        }
        // Tag exclusion only applies to footage; stills are matched on orientation alone
        if self.kind == MediaKind::Video && !self.exclude_tags.is_empty() {
            let excluded = hit.tags.iter().any(|tag| {
                let tag = tag.to_lowercase();
                self.exclude_tags.iter().any(|needle| tag.contains(needle))
            });
            if excluded {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        hits.into_iter().filter(|hit| self.accepts(hit)).collect()
    }
}
