pub mod compiler;
pub mod jobs;
pub mod probe;
pub mod services;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::reel::progress::ProgressSink;

pub use compiler::FfmpegCompiler;
pub use jobs::{JobKind, TranscodeJob};
pub use probe::MediaProbe;
pub use services::SystemTranscoder;

/// The transcoding engine, seen from the pipeline.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaProbe>;

    /// Run `job` to completion, forwarding progress to `sink`
    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> Result<()>;
}
