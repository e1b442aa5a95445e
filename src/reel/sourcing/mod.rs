//! Stock media sourcing for one segment at a time.

pub mod dedup;
pub mod download;
pub mod pexels;
pub mod prompt;
pub mod search;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::reel::config::SearchConfig;
use crate::reel::error::SegmentError;
use crate::reel::progress::ProgressSink;
use crate::reel::render::Transcoder;
use crate::reel::segment::{Segment, SegmentStatus};
use crate::reel::types::{MediaAsset, MediaKind, Orientation};
use crate::ui::prelude::Level;

pub use dedup::DedupSet;
pub use download::{AssetFetcher, HttpFetcher};
pub use pexels::PexelsClient;
pub use prompt::derive_prompt;
pub use search::{HitFilter, MediaSearch, SearchError, SearchHit, SearchRequest};

/// Slack under which accumulated footage counts as covering its target
const FILL_EPSILON: f64 = 0.05;

/// How far sourcing got for a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourcingOutcome {
    /// Accumulated duration meets the target (always the case for stills)
    Filled,
    /// Some footage was found but the provider ran out before the target
    Partial { accumulated: f64 },
}

pub struct MediaSourcer<'a> {
    search: &'a dyn MediaSearch,
    fetcher: &'a dyn AssetFetcher,
    transcoder: &'a dyn Transcoder,
    config: &'a SearchConfig,
    filter: HitFilter,
    kind: MediaKind,
    orientation: Orientation,
}

impl<'a> MediaSourcer<'a> {
    pub fn new(
        search: &'a dyn MediaSearch,
        fetcher: &'a dyn AssetFetcher,
        transcoder: &'a dyn Transcoder,
        config: &'a SearchConfig,
        kind: MediaKind,
        orientation: Orientation,
    ) -> Self {
        let exclude: &[String] = if config.exclude_tagged_footage {
            &config.exclude_tags
        } else {
            &[]
        };
        Self {
            search,
            fetcher,
            transcoder,
            config,
            filter: HitFilter::new(orientation, kind, exclude),
            kind,
            orientation,
        }
    }

    /// Fill `segment` with media until its target duration is covered.
    ///
    /// Stills need a single asset. Footage is accumulated clip by clip,
    /// bounded by `max_assets_per_segment`. Every URL is claimed in `dedup`
    /// before it is downloaded.
    pub async fn source(
        &self,
        segment: &mut Segment,
        dedup: &mut DedupSet,
        raw_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<SourcingOutcome, SegmentError> {
        let mut pages = PageCache::default();
        let max_assets = match self.kind {
            MediaKind::Image => 1,
            MediaKind::Video => self.config.max_assets_per_segment.max(1),
        };

        while segment.assets.len() < max_assets {
            let Some(hit) = self
                .next_unclaimed(&segment.prompt, segment.index, dedup, &mut pages, sink)
                .await
            else {
                break;
            };

            sink.status(
                Level::Debug,
                "reel.source.claim",
                &format!("Segment {}: claimed {}", segment.index + 1, hit.url),
            );

            let asset = self.fetch_asset(&hit, raw_dir).await?;
            segment.assets.push(asset);

            if self.covers(segment) {
                break;
            }
        }

        if segment.assets.is_empty() {
            return Err(SegmentError::MediaNotFound(segment.prompt.clone()));
        }

        let accumulated = segment.accumulated_duration();
        if self.kind == MediaKind::Video && accumulated <= 0.0 {
            return Err(SegmentError::SourcingExhausted {
                assets: segment.assets.len(),
                accumulated,
                target: segment.target_duration,
            });
        }

        segment.advance(SegmentStatus::Sourced);
        if self.covers(segment) {
            Ok(SourcingOutcome::Filled)
        } else {
            Ok(SourcingOutcome::Partial { accumulated })
        }
    }

    fn covers(&self, segment: &Segment) -> bool {
        match self.kind {
            MediaKind::Image => !segment.assets.is_empty(),
            MediaKind::Video => {
                segment.accumulated_duration() + FILL_EPSILON >= segment.target_duration
            }
        }
    }

    /// First result not yet claimed by any segment.
    ///
    /// Page 1 is tried first; when everything on it is taken, up to
    /// `alternate_attempts` further pages of the same query are walked.
    async fn next_unclaimed(
        &self,
        query: &str,
        segment: usize,
        dedup: &mut DedupSet,
        pages: &mut PageCache,
        sink: &dyn ProgressSink,
    ) -> Option<SearchHit> {
        let last_page = 1 + self.config.alternate_attempts;

        for page in 1..=last_page {
            if pages.get(page).is_none() {
                let fetched = self.fetch_page(query, page, sink).await?;
                pages.insert(page, fetched);
            }
            let hits = pages.get(page)?;

            if let Some(hit) = hits.iter().find(|hit| !dedup.contains(&hit.url))
                && dedup.claim(&hit.url, segment)
            {
                return Some(hit.clone());
            }

            if pages.exhausted(page) {
                return None;
            }

            if page < last_page {
                sink.status(
                    Level::Debug,
                    "reel.source.alternate",
                    &format!("No unused result for '{query}' on page {page}, trying page {}", page + 1),
                );
            }
        }
        None
    }

    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        sink: &dyn ProgressSink,
    ) -> Option<(Vec<SearchHit>, bool)> {
        let per_page = self.config.results_per_page.max(1);
        let request = SearchRequest {
            query: query.to_string(),
            kind: self.kind,
            orientation: self.orientation,
            per_page,
            page,
        };

        match self.search.search(&request).await {
            Ok(hits) => {
                let exhausted = hits.len() < per_page as usize;
                Some((self.filter.apply(hits), exhausted))
            }
            Err(err) => {
                sink.status(
                    Level::Warn,
                    "reel.source.search_failed",
                    &format!("Search for '{query}' failed: {err}"),
                );
                None
            }
        }
    }

    async fn fetch_asset(&self, hit: &SearchHit, raw_dir: &Path) -> Result<MediaAsset, SegmentError> {
        let staged_path = raw_asset_path(raw_dir, &hit.url, self.kind);
        let download_error = |reason: String| SegmentError::Download {
            url: hit.url.clone(),
            reason,
        };

        self.fetcher
            .fetch(&hit.url, &staged_path)
            .await
            .map_err(|err| download_error(format!("{err:#}")))?;

        let mut asset = MediaAsset {
            url: hit.url.clone(),
            staged_path,
            normalized_path: None,
            orientation: self.orientation,
            raw_duration: None,
            width: hit.width,
            height: hit.height,
        };

        if self.kind == MediaKind::Video {
            let probe = self
                .transcoder
                .probe(&asset.staged_path)
                .await
                .map_err(|err| download_error(format!("downloaded file is unreadable: {err:#}")))?;
            asset.raw_duration = probe.duration.or(hit.duration);
            if let (Some(width), Some(height)) = (probe.width, probe.height) {
                asset.width = width;
                asset.height = height;
            }
        }

        Ok(asset)
    }
}

/// Result pages already fetched for the current segment's query
#[derive(Default)]
struct PageCache {
    pages: HashMap<u32, Vec<SearchHit>>,
    exhausted: HashMap<u32, bool>,
}

impl PageCache {
    fn get(&self, page: u32) -> Option<&Vec<SearchHit>> {
        self.pages.get(&page)
    }

    fn insert(&mut self, page: u32, (hits, exhausted): (Vec<SearchHit>, bool)) {
        self.exhausted.insert(page, exhausted);
        self.pages.insert(page, hits);
    }

    /// Whether the provider had nothing beyond `page`
    fn exhausted(&self, page: u32) -> bool {
        self.exhausted.get(&page).copied().unwrap_or(false)
    }
}

/// Content-addressed name for a download, unique per URL within a run
fn raw_asset_path(raw_dir: &Path, url: &str, kind: MediaKind) -> PathBuf {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    raw_dir.join(format!("{}.{}", &digest[..16], kind.raw_extension()))
}
