//! One end-to-end run: script and narration in, muxed video out.
//!
//! Segments are processed strictly one after another. The deduplication set
//! is owned by the run and lent to each sourcing step in turn.

mod report;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;

use super::config::ReelConfig;
use super::error::{ReelError, SegmentError};
use super::planning::{Plan, Segmenter, SlotFill, backfill};
use super::progress::ProgressSink;
use super::render::ffmpeg::compiler::VideoDimensions;
use super::render::output::{output_stem, report_path, resolve_output_path};
use super::render::{FfmpegCompiler, Normalizer, Reconciler, Timeline, Transcoder};
use super::segment::{Segment, SegmentStatus};
use super::sourcing::{AssetFetcher, DedupSet, MediaSearch, MediaSourcer, SourcingOutcome, derive_prompt};
use super::translate::{Translator, translate_or_original};
use super::types::{MediaKind, Orientation};
use super::workspace::RunWorkspace;
use crate::ui::prelude::Level;

pub use report::RunOutput;

/// Containers whose audio track is extracted before use as narration
const VIDEO_CONTAINERS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "m4v"];

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub script: String,
    /// Source file of the script; names the output when no path is given
    pub script_path: Option<PathBuf>,
    pub narration: PathBuf,
    pub music: PathBuf,
    pub orientation: Orientation,
    pub media: MediaKind,
    pub max_segments: Option<usize>,
    pub output: Option<PathBuf>,
    pub force: bool,
    pub translate: bool,
    pub strict: bool,
    pub keep_workspace: bool,
}

/// External services a run depends on
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn MediaSearch>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub transcoder: Arc<dyn Transcoder>,
    pub translator: Arc<dyn Translator>,
}

pub struct ReelPipeline<'a> {
    config: &'a ReelConfig,
    services: Collaborators,
    sink: &'a dyn ProgressSink,
}

/// Per-run helpers shared by the segment stages
struct Stage<'r> {
    sourcer: MediaSourcer<'r>,
    normalizer: Normalizer<'r>,
    reconciler: Reconciler<'r>,
    workspace: &'r RunWorkspace,
    media: MediaKind,
}

impl<'a> ReelPipeline<'a> {
    pub fn new(config: &'a ReelConfig, services: Collaborators, sink: &'a dyn ProgressSink) -> Self {
        Self {
            config,
            services,
            sink,
        }
    }

    fn status(&self, level: Level, code: &'static str, message: impl AsRef<str>) {
        self.sink.status(level, code, message.as_ref());
    }

    /// Execute one run.
    ///
    /// Only missing inputs, an empty timeline and final assembly failures
    /// end the run with an error; everything that goes wrong inside a single
    /// segment is recorded on that segment instead.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutput, ReelError> {
        validate_inputs(request)?;

        let output = resolve_output_path(
            request.output.as_deref(),
            &self.config.paths.output_root(),
            &output_stem(request.script_path.as_deref()),
            request.force,
        )?;

        let result = self.assemble(request, &output).await;
        if result.is_err() {
            // Neither the reserved name nor a half-written file is handed back
            let _ = std::fs::remove_file(&output);
        }
        result
    }

    async fn assemble(&self, request: &RunRequest, output: &Path) -> Result<RunOutput, ReelError> {
        let keep = request.keep_workspace || self.config.paths.keep_workspace;
        let workspace = RunWorkspace::create(&self.config.paths.staging_root(), keep)
            .map_err(ReelError::Workspace)?;
        self.status(
            Level::Debug,
            "reel.run.workspace",
            format!("Run workspace: {}", workspace.root().display()),
        );

        let narration = self.prepare_narration(&request.narration, &workspace).await?;
        let total = self.probe_total_duration(&narration).await?;
        self.status(
            Level::Info,
            "reel.narration.duration",
            format!("Narration lasts {total:.2}s"),
        );

        let script = if request.translate && self.config.translation.enabled {
            translate_or_original(
                self.services.translator.as_ref(),
                &request.script,
                &self.config.translation.target_language,
                self.sink,
            )
            .await
        } else {
            request.script.clone()
        };

        let segmenter = Segmenter::new(
            self.config
                .segmentation
                .effective_max_segments(request.max_segments),
            self.config.segmentation.min_segment_chars,
        );
        let plan = Plan::build(&script, total, &segmenter);
        if plan.is_empty() {
            return Err(ReelError::ZeroSegmentsProduced(
                "the script contains no text".to_string(),
            ));
        }
        self.status(
            Level::Info,
            "reel.plan.ready",
            format!(
                "Script split into {} segment(s) of {:.2}s each",
                plan.segments.len(),
                total / plan.segments.len() as f64
            ),
        );

        let mut segments = self.segments_from_plan(&plan);

        let compiler = FfmpegCompiler::new(
            VideoDimensions::for_orientation(request.orientation),
            self.config.render.clone(),
        );
        let transcoder = self.services.transcoder.as_ref();
        let stage = Stage {
            sourcer: MediaSourcer::new(
                self.services.search.as_ref(),
                self.services.fetcher.as_ref(),
                transcoder,
                &self.config.search,
                request.media,
                request.orientation,
            ),
            normalizer: Normalizer::new(transcoder, &compiler, request.media),
            reconciler: Reconciler::new(
                transcoder,
                &compiler,
                self.config.render.reconcile_tolerance(request.strict),
            ),
            workspace: &workspace,
            media: request.media,
        };

        let mut dedup = DedupSet::new();
        for segment in &mut segments {
            self.process_segment(segment, &mut dedup, &stage).await;
        }

        let usable = segments.iter().filter(|s| s.is_usable()).count();
        if usable == 0 {
            return Err(ReelError::ZeroSegmentsProduced(format!(
                "none of the {} segment(s) could be illustrated",
                segments.len()
            )));
        }

        self.apply_backfill(&mut segments, total, &stage).await;

        let fitted_music = workspace.file("music_fit.m4a");
        let fit = compiler.fit_music(&request.music, &fitted_music, total);
        transcoder
            .run(&fit, self.sink)
            .await
            .map_err(ReelError::TranscodeFailure)?;

        let timeline = self
            .build_timeline(&segments, narration, fitted_music, total, request.media)
            .await?;
        self.status(
            Level::Info,
            "reel.timeline.ready",
            format!(
                "Timeline has {} entr{} covering {:.2}s",
                timeline.entries.len(),
                if timeline.entries.len() == 1 { "y" } else { "ies" },
                timeline.entries_duration()
            ),
        );
        for entry in &timeline.entries {
            self.status(
                Level::Debug,
                "reel.timeline.entry",
                format!(
                    "Entry {}: segment {} for {:.2}s",
                    entry.index + 1,
                    entry.source_segment + 1,
                    entry.duration
                ),
            );
        }

        let list = workspace.file("timeline.txt");
        timeline
            .write_descriptor(&list)
            .map_err(ReelError::TranscodeFailure)?;

        let mux = compiler.mux(&timeline, &list, output);
        transcoder
            .run(&mux, self.sink)
            .await
            .map_err(ReelError::TranscodeFailure)?;

        let final_duration = self.verify_output(output, total).await;

        let mut run_output = RunOutput {
            output: output.to_path_buf(),
            orientation: request.orientation,
            media: request.media,
            strategy: plan.strategy,
            total_duration: total,
            final_duration,
            segments: segments.iter().map(Segment::report).collect(),
            report_path: None,
            workspace: workspace.is_kept().then(|| workspace.root().to_path_buf()),
        };

        let report = report_path(output);
        match run_output.write_json(&report) {
            Ok(()) => run_output.report_path = Some(report),
            Err(err) => self.status(
                Level::Warn,
                "reel.report.failed",
                format!("Could not write run report: {err:#}"),
            ),
        }

        self.status(
            Level::Success,
            "reel.run.done",
            format!("Rendered {}", output.display()),
        );
        Ok(run_output)
    }

    fn segments_from_plan(&self, plan: &Plan) -> Vec<Segment> {
        let search = &self.config.search;
        plan.segments
            .iter()
            .map(|planned| {
                let mut segment =
                    Segment::new(planned.index, planned.text.clone(), planned.target_duration);
                segment.prompt = derive_prompt(
                    &planned.text,
                    search.prompt_keywords,
                    &search.prompt_themes,
                    planned.index,
                );
                segment
            })
            .collect()
    }

    /// Narration delivered in a video container is converted to an audio
    /// track inside the workspace first.
    async fn prepare_narration(
        &self,
        narration: &Path,
        workspace: &RunWorkspace,
    ) -> Result<PathBuf, ReelError> {
        let is_container = narration
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| VIDEO_CONTAINERS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_container {
            return Ok(narration.to_path_buf());
        }

        let extracted = workspace.file("narration.mp3");
        let compiler = FfmpegCompiler::new(
            VideoDimensions::for_orientation(Orientation::default()),
            self.config.render.clone(),
        );
        let job = compiler.extract_audio(narration, &extracted);
        self.services
            .transcoder
            .run(&job, self.sink)
            .await
            .map_err(|source| ReelError::InvalidInput {
                what: "narration",
                path: narration.to_path_buf(),
                source,
            })?;

        self.status(
            Level::Debug,
            "reel.narration.extracted",
            format!("Extracted narration audio to {}", extracted.display()),
        );
        Ok(extracted)
    }

    async fn probe_total_duration(&self, narration: &Path) -> Result<f64, ReelError> {
        self.services
            .transcoder
            .probe(narration)
            .await
            .and_then(|probe| probe.require_duration(narration))
            .map_err(|source| ReelError::InvalidInput {
                what: "narration",
                path: narration.to_path_buf(),
                source,
            })
    }

    async fn process_segment(&self, segment: &mut Segment, dedup: &mut DedupSet, stage: &Stage<'_>) {
        let label = segment.index + 1;
        self.status(
            Level::Info,
            "reel.segment.start",
            format!(
                "Segment {label}: searching '{}' for {:.2}s",
                segment.prompt, segment.target_duration
            ),
        );

        match self.fill_segment(segment, dedup, stage).await {
            Ok(()) => self.status(
                Level::Success,
                "reel.segment.done",
                format!(
                    "Segment {label}: {} asset(s), {:.2}s",
                    segment.assets.len(),
                    segment.final_duration.unwrap_or_default()
                ),
            ),
            Err(err) if err.is_skip() => {
                segment.mark_skipped(err.to_string());
                self.status(
                    Level::Warn,
                    "reel.segment.skipped",
                    format!("Segment {label} skipped: {err}"),
                );
            }
            Err(err) => {
                segment.mark_failed(err.to_string());
                self.status(
                    Level::Warn,
                    "reel.segment.failed",
                    format!("Segment {label} dropped: {err}"),
                );
            }
        }
    }

    async fn fill_segment(
        &self,
        segment: &mut Segment,
        dedup: &mut DedupSet,
        stage: &Stage<'_>,
    ) -> Result<(), SegmentError> {
        let outcome = stage
            .sourcer
            .source(segment, dedup, &stage.workspace.raw_dir(), self.sink)
            .await?;
        segment.fully_sourced = outcome == SourcingOutcome::Filled;

        let normalized_dir = stage.workspace.normalized_dir();
        let mut clips = Vec::with_capacity(segment.assets.len());
        for asset in &mut segment.assets {
            clips.push(
                stage
                    .normalizer
                    .normalize(asset, &normalized_dir, self.sink)
                    .await?,
            );
        }
        segment.advance(SegmentStatus::Normalized);

        match stage.media {
            MediaKind::Image => {
                // Stills get their length from the timeline entry
                segment.final_path = clips.into_iter().next();
                segment.final_duration = Some(segment.target_duration);
            }
            MediaKind::Video => {
                let stem = format!("seg_{:03}", segment.index);
                let segments_dir = stage.workspace.segments_dir();
                let (joined, available) = stage
                    .reconciler
                    .join(&clips, &segments_dir, &stem, self.sink)
                    .await?;

                let target = segment.target_duration.min(available);
                let trimmed = segments_dir.join(format!("{stem}_final.mp4"));
                let reconciled = stage
                    .reconciler
                    .trim_to(&joined, target, &trimmed, self.sink)
                    .await?;

                if !reconciled.within_tolerance {
                    segment.set_note(format!(
                        "duration {:.2}s outside tolerance of target {target:.2}s",
                        reconciled.duration
                    ));
                }
                segment.joined_path = Some(joined);
                segment.available_duration = Some(available);
                segment.final_path = Some(reconciled.path);
                segment.final_duration = Some(reconciled.duration);
            }
        }

        if let SourcingOutcome::Partial { accumulated } = outcome {
            segment.set_note(format!(
                "only {accumulated:.2}s of {:.2}s could be sourced",
                segment.target_duration
            ));
        }

        segment.advance(SegmentStatus::Reconciled);
        Ok(())
    }

    /// Spread the gap between the narration length and the rendered segments
    /// over the fully sourced segments.
    async fn apply_backfill(&self, segments: &mut [Segment], total: f64, stage: &Stage<'_>) {
        let slots: Vec<SlotFill> = segments
            .iter()
            .map(|segment| {
                let duration = segment.final_duration.unwrap_or(0.0);
                if !segment.is_usable() {
                    SlotFill::empty()
                } else if !segment.fully_sourced {
                    SlotFill::partial(duration)
                } else {
                    let headroom = segment
                        .available_duration
                        .map(|available| (available - duration).max(0.0));
                    SlotFill::filled(duration, headroom)
                }
            })
            .collect();

        let plan = backfill(total, &slots);
        if plan.is_noop() && plan.uncovered <= 0.0 {
            return;
        }

        for (segment, extra) in segments.iter_mut().zip(plan.extensions.iter().copied()) {
            if extra <= 0.0 {
                continue;
            }
            self.extend_segment(segment, extra, stage).await;
        }

        let tolerance = stage.reconciler.tolerance();
        if plan.uncovered > tolerance {
            self.status(
                Level::Warn,
                "reel.backfill.shortfall",
                format!(
                    "Duration tolerance exceeded: {:.2}s of narration has no footage to cover it",
                    plan.uncovered
                ),
            );
        }
    }

    async fn extend_segment(&self, segment: &mut Segment, extra: f64, stage: &Stage<'_>) {
        let current = segment.final_duration.unwrap_or(0.0);
        let extended = current + extra;

        match stage.media {
            MediaKind::Image => {
                segment.final_duration = Some(extended);
            }
            MediaKind::Video => {
                let Some(joined) = segment.joined_path.clone() else {
                    return;
                };
                let output = stage
                    .workspace
                    .segments_dir()
                    .join(format!("seg_{:03}_extended.mp4", segment.index));
                match stage
                    .reconciler
                    .trim_to(&joined, extended, &output, self.sink)
                    .await
                {
                    Ok(reconciled) => {
                        segment.final_path = Some(reconciled.path);
                        segment.final_duration = Some(reconciled.duration);
                    }
                    Err(err) => {
                        self.status(
                            Level::Warn,
                            "reel.backfill.failed",
                            format!(
                                "Segment {} keeps {current:.2}s, extension failed: {err}",
                                segment.index + 1
                            ),
                        );
                        return;
                    }
                }
            }
        }

        self.status(
            Level::Debug,
            "reel.backfill.extend",
            format!(
                "Segment {} extended by {extra:.2}s to {:.2}s",
                segment.index + 1,
                segment.final_duration.unwrap_or(extended)
            ),
        );
    }

    /// Ordered timeline of the usable segments, each entry checked before
    /// it is handed to the muxer.
    async fn build_timeline(
        &self,
        segments: &[Segment],
        narration: PathBuf,
        music: PathBuf,
        total: f64,
        media: MediaKind,
    ) -> Result<Timeline, ReelError> {
        let mut timeline = Timeline::new(narration, music, total);

        for segment in segments.iter().filter(|s| s.is_usable()) {
            let (Some(path), Some(duration)) = (&segment.final_path, segment.final_duration) else {
                continue;
            };

            if !path.is_file() {
                return Err(ReelError::TranscodeFailure(anyhow!(
                    "timeline entry {} is missing",
                    path.display()
                )));
            }
            if media == MediaKind::Video {
                self.services
                    .transcoder
                    .probe(path)
                    .await
                    .and_then(|probe| probe.require_duration(path))
                    .map_err(ReelError::TranscodeFailure)?;
            }
            if duration <= 0.0 {
                return Err(ReelError::TranscodeFailure(anyhow!(
                    "timeline entry {} has no duration",
                    path.display()
                )));
            }

            timeline.push(segment.index, path.clone(), duration);
        }

        if timeline.is_empty() {
            return Err(ReelError::ZeroSegmentsProduced(
                "no timeline entries remain".to_string(),
            ));
        }
        Ok(timeline)
    }

    /// Compare the rendered length with the narration; drift is only reported.
    async fn verify_output(&self, output: &Path, total: f64) -> Option<f64> {
        let tolerance = self.config.render.final_tolerance();
        match self.services.transcoder.probe(output).await {
            Ok(probe) => {
                let duration = probe.duration?;
                if (duration - total).abs() > tolerance {
                    self.status(
                        Level::Warn,
                        "reel.final.drift",
                        format!(
                            "Duration tolerance exceeded: output is {duration:.2}s, narration is {total:.2}s"
                        ),
                    );
                }
                Some(duration)
            }
            Err(err) => {
                self.status(
                    Level::Warn,
                    "reel.final.probe_failed",
                    format!("Could not probe {}: {err:#}", output.display()),
                );
                None
            }
        }
    }
}

fn validate_inputs(request: &RunRequest) -> Result<(), ReelError> {
    if !request.narration.is_file() {
        return Err(ReelError::MissingRequiredInput {
            what: "narration audio",
            path: request.narration.clone(),
        });
    }
    if !request.music.is_file() {
        return Err(ReelError::MissingRequiredInput {
            what: "background music",
            path: request.music.clone(),
        });
    }
    Ok(())
}
