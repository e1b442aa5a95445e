use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::Transcoder;
use super::jobs::TranscodeJob;
use super::probe::{MediaProbe, parse_probe_json, probe_args};
use crate::reel::config::ToolPaths;
use crate::reel::progress::ProgressSink;

/// Runs the ffmpeg and ffprobe binaries found on the configured paths.
#[derive(Debug, Clone)]
pub struct SystemTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    verbose: bool,
}

impl SystemTranscoder {
    pub fn new(tools: &ToolPaths, verbose: bool) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
            verbose,
        }
    }
}

#[async_trait]
impl Transcoder for SystemTranscoder {
    async fn probe(&self, path: &Path) -> Result<MediaProbe> {
        let output = Command::new(&self.ffprobe)
            .args(probe_args(path))
            .output()
            .await
            .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

        if !output.status.success() {
            bail!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("Failed to read ffprobe output for {}", path.display()))
    }

    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> Result<()> {
        let mut child = Command::new(&self.ffmpeg)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.ffmpeg.display()))?;

        let stderr = child
            .stderr
            .take()
            .context("Failed to capture ffmpeg stderr")?;

        let expected = job.expected_duration.filter(|_| job.reports_progress());
        if expected.is_some() {
            sink.transcode_started(job.kind.label());
        }

        let mut tail = StderrTail::default();
        let read_result = read_ffmpeg_stderr(stderr, self.verbose, expected, sink, &mut tail).await;

        let status = child.wait().await.context("Failed to wait for ffmpeg")?;
        if expected.is_some() {
            sink.transcode_finished(status.success() && read_result.is_ok());
        }
        read_result?;

        if !status.success() {
            bail!(
                "ffmpeg ({}) exited with status {:?}: {}",
                job.kind,
                status.code(),
                tail.message()
            );
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct StderrTail {
    last_line: String,
    error_lines: Vec<String>,
}

impl StderrTail {
    fn message(&self) -> String {
        if self.error_lines.is_empty() {
            self.last_line.trim().to_string()
        } else {
            self.error_lines.join("\n").trim().to_string()
        }
    }
}

async fn read_ffmpeg_stderr<R: AsyncRead + Unpin>(
    mut stderr: R,
    verbose: bool,
    expected: Option<f64>,
    sink: &dyn ProgressSink,
    tail: &mut StderrTail,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .await
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        // ffmpeg rewrites its status line with carriage returns
        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.drain(..=pos);

            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{line}");
            }

            if line.to_lowercase().contains("error") {
                tail.error_lines.push(line.clone());
            }

            if let Some(total) = expected
                && let Some(position) = parse_ffmpeg_progress(&line)
            {
                sink.transcode_progress(progress_percent(position, total));
            }

            tail.last_line = line;
        }
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn progress_percent(position: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (position / total * 100.0).clamp(0.0, 100.0)
}
