use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a run.
///
/// Everything that goes wrong inside a single segment is reported as a
/// [`SegmentError`] and turned into a skip or drop decision instead.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Required input missing: {what} not found at {}", path.display())]
    MissingRequiredInput { what: &'static str, path: PathBuf },

    #[error("Could not read {what} at {}: {source}", path.display())]
    InvalidInput {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Output file {} already exists. Use --force to overwrite.", path.display())]
    OutputExists { path: PathBuf },

    #[error("No segments produced: {0}")]
    ZeroSegmentsProduced(String),

    #[error("Final assembly failed: {0:#}")]
    TranscodeFailure(anyhow::Error),

    #[error("Run workspace error: {0:#}")]
    Workspace(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Segment-local failures.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("no unused media found for query '{0}'")]
    MediaNotFound(String),

    #[error("sourcing exhausted after {assets} asset(s), {accumulated:.2}s of {target:.2}s")]
    SourcingExhausted {
        assets: usize,
        accumulated: f64,
        target: f64,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("normalizing {} failed: {reason}", path.display())]
    NormalizeFailure { path: PathBuf, reason: String },

    #[error("reconciling segment failed: {0}")]
    ReconcileFailure(String),
}

impl SegmentError {
    /// Whether the segment should be marked skipped (nothing usable was found)
    /// rather than failed (something broke while processing it).
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            SegmentError::MediaNotFound(_) | SegmentError::SourcingExhausted { .. }
        )
    }
}
