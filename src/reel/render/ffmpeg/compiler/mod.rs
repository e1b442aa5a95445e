mod audio;
pub mod util;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use self::audio::MIXED_AUDIO_LABEL;
use self::util::{format_time, path_arg};
use super::jobs::{JobKind, TranscodeJob};
use crate::reel::config::RenderSettings;
use crate::reel::render::timeline::Timeline;
use crate::reel::types::{MediaKind, Orientation};

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// Video dimensions (width x height in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn for_orientation(orientation: Orientation) -> Self {
        let (width, height) = orientation.target_dimensions();
        Self::new(width, height)
    }
}

/// Builds the argument lists of every ffmpeg job a run needs.
pub struct FfmpegCompiler {
    dimensions: VideoDimensions,
    settings: RenderSettings,
}

impl FfmpegCompiler {
    pub fn new(dimensions: VideoDimensions, settings: RenderSettings) -> Self {
        Self {
            dimensions,
            settings,
        }
    }

    /// Audio track of a narration delivered inside a video container
    pub fn extract_audio(&self, input: &Path, output: &Path) -> TranscodeJob {
        let mut args = base_args();
        push_input(&mut args, input);
        args.extend(strings(&["-vn", "-c:a", "libmp3lame", "-q:a", "2"]));
        args.push(path_arg(output));

        job(JobKind::ExtractAudio, args, vec![input.into()], output, None)
    }

    /// Scale and crop to the target frame, fix the frame rate and drop audio.
    ///
    /// Stills become a single normalized frame.
    pub fn normalize(
        &self,
        kind: MediaKind,
        input: &Path,
        output: &Path,
        expected_duration: Option<f64>,
    ) -> TranscodeJob {
        let VideoDimensions { width, height } = self.dimensions;
        let frame = format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},setsar=1"
        );

        let mut args = base_args();
        push_input(&mut args, input);
        args.push("-vf".to_string());
        match kind {
            MediaKind::Video => {
                args.push(format!("{frame},fps={}", self.settings.fps()));
                args.push("-an".to_string());
                self.push_video_codec(&mut args, "veryfast");
            }
            MediaKind::Image => {
                args.push(frame);
                args.extend(strings(&["-frames:v", "1", "-q:v", "2"]));
            }
        }
        args.push(path_arg(output));

        job(
            JobKind::Normalize,
            args,
            vec![input.into()],
            output,
            expected_duration.filter(|_| kind == MediaKind::Video),
        )
    }

    /// Join normalized clips in order without re-encoding
    pub fn concat_clips(
        &self,
        list: &Path,
        inputs: Vec<PathBuf>,
        output: &Path,
        expected_duration: Option<f64>,
    ) -> TranscodeJob {
        let mut args = base_args();
        push_concat_input(&mut args, list);
        args.extend(strings(&["-c", "copy"]));
        args.push(path_arg(output));

        job(JobKind::Concat, args, inputs, output, expected_duration)
    }

    /// Hard cut to `duration` seconds
    pub fn trim(&self, input: &Path, output: &Path, duration: f64) -> TranscodeJob {
        let mut args = base_args();
        push_input(&mut args, input);
        args.push("-t".to_string());
        args.push(format_time(duration));
        args.push("-an".to_string());
        args.push("-r".to_string());
        args.push(self.settings.fps().to_string());
        self.push_video_codec(&mut args, "veryfast");
        args.push(path_arg(output));

        job(JobKind::Trim, args, vec![input.into()], output, Some(duration))
    }

    /// Background track looped as needed and cut to `total_duration`
    pub fn fit_music(&self, input: &Path, output: &Path, total_duration: f64) -> TranscodeJob {
        let mut args = base_args();
        args.extend(strings(&["-stream_loop", "-1"]));
        push_input(&mut args, input);
        args.push("-t".to_string());
        args.push(format_time(total_duration));
        args.push("-vn".to_string());
        self.push_audio_codec(&mut args);
        args.push(path_arg(output));

        job(
            JobKind::FitMusic,
            args,
            vec![input.into()],
            output,
            Some(total_duration),
        )
    }

    /// Final render: concatenated timeline video, mixed narration and music.
    ///
    /// Inputs are the concat list (0), the narration (1) and the fitted
    /// background track (2).
    pub fn mux(&self, timeline: &Timeline, list: &Path, output: &Path) -> TranscodeJob {
        let mut args = base_args();
        push_concat_input(&mut args, list);
        push_input(&mut args, &timeline.narration);
        push_input(&mut args, &timeline.music);

        let mut filters = FilterChain::new();
        self.build_audio_mix_filters(&mut filters, timeline.total_duration);
        args.push("-filter_complex".to_string());
        args.push(filters.join());

        args.push("-map".to_string());
        args.push("0:v".to_string());
        args.push("-map".to_string());
        args.push(format!("[{MIXED_AUDIO_LABEL}]"));

        args.push("-r".to_string());
        args.push(self.settings.fps().to_string());
        self.push_video_codec(&mut args, "medium");
        self.push_audio_codec(&mut args);
        args.extend(strings(&["-movflags", "+faststart", "-shortest"]));
        args.push(path_arg(output));

        let mut inputs: Vec<PathBuf> = timeline.entries.iter().map(|e| e.path.clone()).collect();
        inputs.push(timeline.narration.clone());
        inputs.push(timeline.music.clone());

        job(
            JobKind::Mux,
            args,
            inputs,
            output,
            Some(timeline.total_duration),
        )
    }

    fn push_video_codec(&self, args: &mut Vec<String>, preset: &str) {
        args.extend(strings(&["-c:v", "libx264", "-preset"]));
        args.push(preset.to_string());
        args.push("-crf".to_string());
        args.push(self.settings.crf.to_string());
        args.extend(strings(&["-pix_fmt", "yuv420p"]));
    }

    fn push_audio_codec(&self, args: &mut Vec<String>) {
        args.extend(strings(&["-c:a", "aac", "-b:a"]));
        args.push(self.settings.audio_bitrate.clone());
    }
}

fn base_args() -> Vec<String> {
    strings(&["-hide_banner", "-nostdin", "-y"])
}

fn push_input(args: &mut Vec<String>, input: &Path) {
    args.push("-i".to_string());
    args.push(path_arg(input));
}

fn push_concat_input(args: &mut Vec<String>, list: &Path) {
    args.extend(strings(&["-f", "concat", "-safe", "0"]));
    push_input(args, list);
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn job(
    kind: JobKind,
    args: Vec<String>,
    inputs: Vec<PathBuf>,
    output: &Path,
    expected_duration: Option<f64>,
) -> TranscodeJob {
    TranscodeJob {
        kind,
        args,
        inputs,
        output: output.to_path_buf(),
        expected_duration,
    }
}
