use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::ffmpeg::compiler::util::{escape_concat_path, format_time};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// Position in the timeline, contiguous from 0
    pub index: usize,
    /// Index of the script segment this entry illustrates
    pub source_segment: usize,
    pub path: PathBuf,
    pub duration: f64,
}

/// Ordered media entries plus the two audio tracks they are mixed with.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub narration: PathBuf,
    pub music: PathBuf,
    /// Narration length; the mixed output ends here
    pub total_duration: f64,
}

impl Timeline {
    pub fn new(narration: PathBuf, music: PathBuf, total_duration: f64) -> Self {
        Self {
            entries: Vec::new(),
            narration,
            music,
            total_duration,
        }
    }

    /// Append the clip for `source_segment`; entries keep the order they are
    /// pushed in and are numbered without gaps.
    pub fn push(&mut self, source_segment: usize, path: PathBuf, duration: f64) {
        self.entries.push(TimelineEntry {
            index: self.entries.len(),
            source_segment,
            path,
            duration,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_duration(&self) -> f64 {
        self.entries.iter().map(|entry| entry.duration).sum()
    }

    /// Concat demuxer script: each entry's file and duration, then the last
    /// file once more without a duration so its frames are flushed.
    pub fn concat_descriptor(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("file '{}'\n", escape_concat_path(&entry.path)));
            out.push_str(&format!("duration {}\n", format_time(entry.duration)));
        }
        if let Some(last) = self.entries.last() {
            out.push_str(&format!("file '{}'\n", escape_concat_path(&last.path)));
        }
        out
    }

    pub fn write_descriptor(&self, path: &Path) -> Result<()> {
        fs::write(path, self.concat_descriptor())
            .with_context(|| format!("Failed to write concat list {}", path.display()))
    }
}

/// Plain concat list for joining clips that keep their own length
pub fn clip_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("file '{}'\n", escape_concat_path(path)))
        .collect()
}
