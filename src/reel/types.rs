use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Frame orientation of the assembled video
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// 16:9, 1920x1080
    #[default]
    Horizontal,
    /// 9:16, 1080x1920
    Vertical,
}

impl Orientation {
    /// Target frame size for normalized media
    pub fn target_dimensions(self) -> (u32, u32) {
        match self {
            Orientation::Horizontal => (1920, 1080),
            Orientation::Vertical => (1080, 1920),
        }
    }

    /// Whether an asset of the given size has this orientation.
    ///
    /// Square assets match neither.
    pub fn matches(self, width: u32, height: u32) -> bool {
        match self {
            Orientation::Horizontal => width > height,
            Orientation::Vertical => height > width,
        }
    }

    /// Value understood by the stock media provider's `orientation` filter
    pub fn provider_value(self) -> &'static str {
        match self {
            Orientation::Horizontal => "landscape",
            Orientation::Vertical => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

/// Kind of stock media that illustrates the segments
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn raw_extension(self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One piece of stock media bound to a segment.
///
/// An asset is owned by exactly one segment; its URL is recorded in the run's
/// deduplication set before it is downloaded.
#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    pub url: String,
    pub staged_path: PathBuf,
    pub normalized_path: Option<PathBuf>,
    pub orientation: Orientation,
    /// Probed duration of the downloaded clip; `None` for still images
    pub raw_duration: Option<f64>,
    pub width: u32,
    pub height: u32,
}

impl MediaAsset {
    /// Duration this asset contributes to its segment
    pub fn usable_duration(&self) -> f64 {
        self.raw_duration.unwrap_or(0.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_matches_by_aspect() {
        assert!(Orientation::Horizontal.matches(1920, 1080));
        assert!(!Orientation::Horizontal.matches(1080, 1920));
        assert!(Orientation::Vertical.matches(720, 1280));
        assert!(!Orientation::Vertical.matches(1000, 1000));
        assert!(!Orientation::Horizontal.matches(1000, 1000));
    }

    #[test]
    fn target_dimensions_follow_orientation() {
        assert_eq!(Orientation::Horizontal.target_dimensions(), (1920, 1080));
        assert_eq!(Orientation::Vertical.target_dimensions(), (1080, 1920));
    }
}
