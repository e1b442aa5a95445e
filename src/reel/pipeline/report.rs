use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::reel::planning::SplitStrategy;
use crate::reel::segment::{SegmentReport, SegmentStatus};
use crate::reel::types::{MediaKind, Orientation};

/// Everything a finished run hands back to its caller
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub output: PathBuf,
    pub orientation: Orientation,
    pub media: MediaKind,
    pub strategy: SplitStrategy,
    pub total_duration: f64,
    /// Probed length of the rendered file, when probing succeeded
    pub final_duration: Option<f64>,
    pub segments: Vec<SegmentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    /// Kept workspace directory, if the run was asked to keep it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

impl RunOutput {
    pub fn count(&self, status: SegmentStatus) -> usize {
        self.segments.iter().filter(|s| s.status == status).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} segment(s) rendered ({} skipped, {} failed), {:.2}s",
            self.count(SegmentStatus::Reconciled),
            self.segments.len(),
            self.count(SegmentStatus::Skipped),
            self.count(SegmentStatus::Failed),
            self.final_duration.unwrap_or(self.total_duration),
        )
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        fs::write(path, json).with_context(|| format!("writing run report {}", path.display()))
    }
}
