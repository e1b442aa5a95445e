pub mod allocator;
pub mod segmenter;

use serde::Serialize;

pub use allocator::{Backfill, SlotFill, backfill, equal_split};
pub use segmenter::{Segmentation, Segmenter, SplitStrategy};

/// One text segment with its slot in the timeline
#[derive(Debug, Clone, Serialize)]
pub struct PlannedSegment {
    pub index: usize,
    pub text: String,
    pub target_duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub strategy: SplitStrategy,
    pub total_duration: f64,
    pub segments: Vec<PlannedSegment>,
}

impl Plan {
    /// Segment `script` and give every segment an equal share of `total_duration`.
    pub fn build(script: &str, total_duration: f64, segmenter: &Segmenter) -> Self {
        let Segmentation { segments, strategy } = segmenter.split(script);
        let targets = equal_split(total_duration, segments.len());

        let segments = segments
            .into_iter()
            .zip(targets)
            .enumerate()
            .map(|(index, (text, target_duration))| PlannedSegment {
                index,
                text,
                target_duration,
            })
            .collect();

        Self {
            strategy,
            total_duration,
            segments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[cfg(test)]
    pub fn target_sum(&self) -> f64 {
        self.segments.iter().map(|s| s.target_duration).sum()
    }
}
