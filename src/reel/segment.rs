use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::types::MediaAsset;

/// Lifecycle of a segment.
///
/// `Pending -> Sourced -> Normalized -> Reconciled` is the success path.
/// `Pending -> Skipped` when nothing could be sourced, and any non-terminal
/// state may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Pending,
    Sourced,
    Normalized,
    Reconciled,
    Failed,
    Skipped,
}

impl SegmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SegmentStatus::Reconciled | SegmentStatus::Failed | SegmentStatus::Skipped
        )
    }

    pub fn can_transition_to(self, next: SegmentStatus) -> bool {
        use SegmentStatus::*;
        match (self, next) {
            (Pending, Sourced) | (Sourced, Normalized) | (Normalized, Reconciled) => true,
            (Pending, Skipped) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Sourced => "sourced",
            SegmentStatus::Normalized => "normalized",
            SegmentStatus::Reconciled => "reconciled",
            SegmentStatus::Failed => "failed",
            SegmentStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One slot in the timeline.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    pub prompt: String,
    pub target_duration: f64,
    pub assets: Vec<MediaAsset>,
    /// Untrimmed concatenation of the segment's normalized clips
    pub joined_path: Option<PathBuf>,
    /// Probed length of `joined_path`
    pub available_duration: Option<f64>,
    /// Sourcing reached the target duration
    pub fully_sourced: bool,
    pub final_path: Option<PathBuf>,
    pub final_duration: Option<f64>,
    status: SegmentStatus,
    note: Option<String>,
}

impl Segment {
    pub fn new(index: usize, text: String, target_duration: f64) -> Self {
        Self {
            index,
            text,
            prompt: String::new(),
            target_duration,
            assets: Vec::new(),
            joined_path: None,
            available_duration: None,
            fully_sourced: false,
            final_path: None,
            final_duration: None,
            status: SegmentStatus::Pending,
            note: None,
        }
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Sum of the durations of the assigned assets
    pub fn accumulated_duration(&self) -> f64 {
        self.assets.iter().map(MediaAsset::usable_duration).sum()
    }

    /// Move to `next`, ignoring transitions the state machine does not allow.
    ///
    /// Returns whether the transition happened.
    pub fn advance(&mut self, next: SegmentStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        if self.advance(SegmentStatus::Skipped) {
            self.note = Some(reason.into());
        }
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if self.advance(SegmentStatus::Failed) {
            self.note = Some(reason.into());
        }
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
    }

    /// Whether the segment ends up in the timeline
    pub fn is_usable(&self) -> bool {
        self.status == SegmentStatus::Reconciled && self.final_path.is_some()
    }

    pub fn report(&self) -> SegmentReport {
        SegmentReport {
            index: self.index,
            status: self.status,
            prompt: self.prompt.clone(),
            target_duration: self.target_duration,
            final_duration: self.final_duration,
            assets: self.assets.iter().map(|asset| asset.url.clone()).collect(),
            note: self.note.clone(),
        }
    }
}

/// Diagnostic record of one segment, returned with the run's output.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub index: usize,
    pub status: SegmentStatus,
    pub prompt: String,
    pub target_duration: f64,
    pub final_duration: Option<f64>,
    pub assets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_is_linear() {
        let mut segment = Segment::new(0, "text".into(), 5.0);
        assert!(!segment.advance(SegmentStatus::Normalized));
        assert!(segment.advance(SegmentStatus::Sourced));
        assert!(segment.advance(SegmentStatus::Normalized));
        assert!(segment.advance(SegmentStatus::Reconciled));
        assert!(segment.status().is_terminal());
    }

    #[test]
    fn skip_only_from_pending() {
        let mut segment = Segment::new(0, "text".into(), 5.0);
        segment.advance(SegmentStatus::Sourced);
        segment.mark_skipped("nothing found");
        assert_eq!(segment.status(), SegmentStatus::Sourced);
        assert!(segment.note().is_none());
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut segment = Segment::new(0, "text".into(), 5.0);
        segment.mark_skipped("nothing found");
        segment.mark_failed("later error");
        assert_eq!(segment.status(), SegmentStatus::Skipped);
        assert_eq!(segment.note(), Some("nothing found"));
    }

    #[test]
    fn failure_from_any_active_state() {
        for steps in 0..3 {
            let mut segment = Segment::new(0, "text".into(), 5.0);
            let path = [
                SegmentStatus::Sourced,
                SegmentStatus::Normalized,
                SegmentStatus::Reconciled,
            ];
            for next in &path[..steps] {
                segment.advance(*next);
            }
            segment.mark_failed("boom");
            assert_eq!(segment.status(), SegmentStatus::Failed);
        }
    }
}
