use std::path::{Path, PathBuf};

use super::ffmpeg::{FfmpegCompiler, Transcoder};
use crate::reel::error::SegmentError;
use crate::reel::progress::ProgressSink;
use crate::reel::types::{MediaAsset, MediaKind};

/// Brings raw assets to the run's frame size and frame rate.
pub struct Normalizer<'a> {
    transcoder: &'a dyn Transcoder,
    compiler: &'a FfmpegCompiler,
    kind: MediaKind,
}

impl<'a> Normalizer<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, compiler: &'a FfmpegCompiler, kind: MediaKind) -> Self {
        Self {
            transcoder,
            compiler,
            kind,
        }
    }

    /// Normalize `asset` into `dest_dir` and record the result on the asset.
    pub async fn normalize(
        &self,
        asset: &mut MediaAsset,
        dest_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf, SegmentError> {
        let output = normalized_path(&asset.staged_path, dest_dir, self.kind);
        let job = self
            .compiler
            .normalize(self.kind, &asset.staged_path, &output, asset.raw_duration);

        let failure = |reason: String| SegmentError::NormalizeFailure {
            path: asset.staged_path.clone(),
            reason,
        };

        self.transcoder
            .run(&job, sink)
            .await
            .map_err(|err| failure(format!("{err:#}")))?;

        if !output.exists() {
            return Err(failure(format!("{} was not produced", output.display())));
        }

        if self.kind == MediaKind::Video {
            let probe = self
                .transcoder
                .probe(&output)
                .await
                .map_err(|err| failure(format!("{err:#}")))?;
            let duration = probe
                .require_duration(&output)
                .map_err(|err| failure(format!("{err:#}")))?;
            asset.raw_duration = Some(duration);
        }

        asset.normalized_path = Some(output.clone());
        Ok(output)
    }
}

fn normalized_path(staged: &Path, dest_dir: &Path, kind: MediaKind) -> PathBuf {
    let stem = staged
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "asset".to_string());
    dest_dir.join(format!("{stem}_norm.{}", kind.raw_extension()))
}
