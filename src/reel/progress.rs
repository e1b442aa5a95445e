//! Progress and status reporting.
//!
//! The pipeline reports through a [`ProgressSink`]. Sink methods return
//! nothing, so a broken terminal or a slow consumer can never fail a run.

use std::sync::Mutex;

use indicatif::ProgressBar;

use crate::common::progress::create_percent_bar;
use crate::ui::prelude::*;

pub trait ProgressSink: Send + Sync {
    /// Human readable status line
    fn status(&self, level: Level, code: &'static str, message: &str);

    /// A transcoding job that reports percentages has started
    fn transcode_started(&self, _label: &str) {}

    /// Approximate completion of the running job, 0 to 100
    fn transcode_progress(&self, _percent: f64) {}

    fn transcode_finished(&self, _success: bool) {}
}

/// Console sink: status lines through `ui::emit`, transcoding progress as an
/// indicatif bar in text mode.
#[derive(Default)]
pub struct ConsoleSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for ConsoleSink {
    fn status(&self, level: Level, code: &'static str, message: &str) {
        emit(level, code, message, None);
    }

    fn transcode_started(&self, label: &str) {
        if get_output_format() == OutputFormat::Json {
            emit(Level::Info, "reel.transcode.start", label, None);
            return;
        }
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(previous) = bar.take() {
                previous.finish_and_clear();
            }
            *bar = Some(create_percent_bar(label));
        }
    }

    fn transcode_progress(&self, percent: f64) {
        if let Ok(bar) = self.bar.lock()
            && let Some(bar) = bar.as_ref()
        {
            bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
        }
    }

    fn transcode_finished(&self, success: bool) {
        if let Ok(mut bar) = self.bar.lock()
            && let Some(bar) = bar.take()
        {
            if success {
                bar.set_position(100);
                bar.finish_with_message("done");
            } else {
                bar.abandon_with_message("failed");
            }
        }
    }
}

#[cfg(test)]
/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[cfg(test)]
impl ProgressSink for NullSink {
    fn status(&self, _level: Level, _code: &'static str, _message: &str) {}
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Status {
        level: Level,
        code: &'static str,
        message: String,
    },
    Started(String),
    Progress(f64),
    Finished(bool),
}

#[cfg(test)]
/// Sink that keeps every event, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Codes of all status events, in order
    pub fn codes(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::Status { code, .. } => Some(code),
                _ => None,
            })
            .collect()
    }

    pub fn progress_values(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::Progress(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: RecordedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn status(&self, level: Level, code: &'static str, message: &str) {
        self.push(RecordedEvent::Status {
            level,
            code,
            message: message.to_string(),
        });
    }

    fn transcode_started(&self, label: &str) {
        self.push(RecordedEvent::Started(label.to_string()));
    }

    fn transcode_progress(&self, percent: f64) {
        self.push(RecordedEvent::Progress(percent));
    }

    fn transcode_finished(&self, success: bool) {
        self.push(RecordedEvent::Finished(success));
    }
}
