//! Per-segment duration reconciliation.
//!
//! Clips are joined in acquisition order, hard-cut to the slot length and
//! re-probed. A result outside the tolerance is trimmed once more; if it is
//! still off, the segment keeps its actual length and a warning is raised.

use std::fs;
use std::path::{Path, PathBuf};

use super::ffmpeg::{FfmpegCompiler, Transcoder};
use super::timeline::clip_list;
use crate::reel::error::SegmentError;
use crate::reel::progress::ProgressSink;
use crate::ui::prelude::Level;

const TRIM_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub path: PathBuf,
    pub duration: f64,
    pub within_tolerance: bool,
}

pub struct Reconciler<'a> {
    transcoder: &'a dyn Transcoder,
    compiler: &'a FfmpegCompiler,
    tolerance: f64,
}

impl<'a> Reconciler<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, compiler: &'a FfmpegCompiler, tolerance: f64) -> Self {
        Self {
            transcoder,
            compiler,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Concatenate `clips` into one file under `dir`, returning its path and
    /// probed duration. A single clip is used as is.
    pub async fn join(
        &self,
        clips: &[PathBuf],
        dir: &Path,
        stem: &str,
        sink: &dyn ProgressSink,
    ) -> Result<(PathBuf, f64), SegmentError> {
        let joined = match clips {
            [] => {
                return Err(SegmentError::ReconcileFailure(
                    "no normalized clips to join".to_string(),
                ));
            }
            [single] => single.clone(),
            many => {
                let list = dir.join(format!("{stem}_clips.txt"));
                fs::write(&list, clip_list(many)).map_err(|err| {
                    SegmentError::ReconcileFailure(format!(
                        "writing {}: {err}",
                        list.display()
                    ))
                })?;

                let output = dir.join(format!("{stem}_joined.mp4"));
                let job = self.compiler.concat_clips(&list, many.to_vec(), &output, None);
                self.transcoder
                    .run(&job, sink)
                    .await
                    .map_err(|err| SegmentError::ReconcileFailure(format!("{err:#}")))?;
                output
            }
        };

        let duration = self.probe_duration(&joined).await?;
        Ok((joined, duration))
    }

    /// Cut `source` to `target` seconds into `output`.
    pub async fn trim_to(
        &self,
        source: &Path,
        target: f64,
        output: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<Reconciled, SegmentError> {
        let job = self.compiler.trim(source, output, target);
        let mut actual = 0.0;

        for attempt in 1..=TRIM_ATTEMPTS {
            self.transcoder
                .run(&job, sink)
                .await
                .map_err(|err| SegmentError::ReconcileFailure(format!("{err:#}")))?;

            actual = self.probe_duration(output).await?;
            if (actual - target).abs() <= self.tolerance {
                return Ok(Reconciled {
                    path: output.to_path_buf(),
                    duration: actual,
                    within_tolerance: true,
                });
            }

            if attempt < TRIM_ATTEMPTS {
                sink.status(
                    Level::Debug,
                    "reel.reconcile.retry",
                    &format!(
                        "{} is {actual:.2}s, expected {target:.2}s; trimming again",
                        output.display()
                    ),
                );
            }
        }

        sink.status(
            Level::Warn,
            "reel.reconcile.tolerance",
            &format!(
                "Duration tolerance exceeded for {}: {actual:.2}s instead of {target:.2}s (tolerance {:.2}s)",
                output.display(),
                self.tolerance
            ),
        );

        Ok(Reconciled {
            path: output.to_path_buf(),
            duration: actual,
            within_tolerance: false,
        })
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, SegmentError> {
        self.transcoder
            .probe(path)
            .await
            .and_then(|probe| probe.require_duration(path))
            .map_err(|err| SegmentError::ReconcileFailure(format!("{err:#}")))
    }
}
