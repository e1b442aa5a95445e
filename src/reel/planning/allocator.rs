//! Duration allocation across segments.
//!
//! Every segment first gets an equal share of the narration. Once the
//! segments have been filled, any shortfall is spread evenly over the
//! segments that reached their target, capped by the media each of them
//! actually has left.

/// Absolute slack below which a shortfall is ignored
const SHORTFALL_EPSILON: f64 = 1e-3;

/// Equal split of `total` seconds into `count` slots.
pub fn equal_split(total: f64, count: usize) -> Vec<f64> {
    if count == 0 || !total.is_finite() || total <= 0.0 {
        return vec![0.0; count];
    }
    let share = total / count as f64;
    vec![share; count]
}

/// What a segment ended up with after reconciliation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotFill {
    /// Duration the segment contributes to the timeline
    pub duration: f64,
    /// Whether the segment reached its target and may be extended
    pub filled: bool,
    /// Extra seconds the segment can stretch to; `None` means unbounded
    pub headroom: Option<f64>,
}

impl SlotFill {
    pub fn filled(duration: f64, headroom: Option<f64>) -> Self {
        Self {
            duration,
            filled: true,
            headroom,
        }
    }

    pub fn partial(duration: f64) -> Self {
        Self {
            duration,
            filled: false,
            headroom: Some(0.0),
        }
    }

    pub fn empty() -> Self {
        Self::partial(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Backfill {
    /// Extra seconds per slot, aligned with the input
    pub extensions: Vec<f64>,
    /// Gap between the total and the filled durations before backfill
    pub shortfall: f64,
    /// Part of the shortfall no segment could absorb
    pub uncovered: f64,
}

impl Backfill {
    pub fn is_noop(&self) -> bool {
        self.extensions.iter().all(|extra| *extra <= 0.0)
    }
}

/// Spread the shortfall between `total` and the filled durations across the
/// `m` filled slots as `shortfall / m` each.
pub fn backfill(total: f64, slots: &[SlotFill]) -> Backfill {
    let filled_sum: f64 = slots.iter().map(|slot| slot.duration.max(0.0)).sum();
    let shortfall = (total - filled_sum).max(0.0);
    let mut extensions = vec![0.0; slots.len()];

    if shortfall <= SHORTFALL_EPSILON {
        return Backfill {
            extensions,
            shortfall,
            uncovered: 0.0,
        };
    }

    let eligible = slots.iter().filter(|slot| slot.filled).count();
    if eligible == 0 {
        return Backfill {
            extensions,
            shortfall,
            uncovered: shortfall,
        };
    }

    let share = shortfall / eligible as f64;
    for (extension, slot) in extensions.iter_mut().zip(slots) {
        if !slot.filled {
            continue;
        }
        *extension = match slot.headroom {
            Some(headroom) => share.min(headroom.max(0.0)),
            None => share,
        };
    }

    let absorbed: f64 = extensions.iter().sum();
    Backfill {
        extensions,
        shortfall,
        uncovered: (shortfall - absorbed).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn equal_split_sums_to_total() {
        let targets = equal_split(80.0, 4);
        assert_eq!(targets, vec![20.0; 4]);

        let targets = equal_split(61.3, 7);
        let sum: f64 = targets.iter().sum();
        assert!(approx(sum, 61.3));
    }

    #[test]
    fn equal_split_handles_degenerate_input() {
        assert!(equal_split(10.0, 0).is_empty());
        assert_eq!(equal_split(-3.0, 2), vec![0.0, 0.0]);
    }

    #[test]
    fn shortfall_is_spread_over_filled_segments() {
        let slots = [
            SlotFill::filled(20.0, Some(10.0)),
            SlotFill::filled(20.0, Some(10.0)),
            SlotFill::partial(14.0),
            SlotFill::filled(20.0, Some(10.0)),
        ];

        let plan = backfill(80.0, &slots);

        assert!(approx(plan.shortfall, 6.0));
        assert!(approx(plan.extensions[0], 2.0));
        assert!(approx(plan.extensions[1], 2.0));
        assert_eq!(plan.extensions[2], 0.0);
        assert!(approx(plan.extensions[3], 2.0));
        assert!(approx(plan.uncovered, 0.0));
    }

    #[test]
    fn extension_is_capped_by_headroom() {
        let slots = [
            SlotFill::filled(10.0, Some(0.5)),
            SlotFill::filled(10.0, None),
            SlotFill::empty(),
        ];

        let plan = backfill(30.0, &slots);

        assert!(approx(plan.extensions[0], 0.5));
        assert!(approx(plan.extensions[1], 5.0));
        assert!(approx(plan.uncovered, 4.5));
    }

    #[test]
    fn nothing_to_do_when_total_is_met() {
        let slots = [SlotFill::filled(40.0, None), SlotFill::filled(40.0, None)];
        let plan = backfill(80.0, &slots);
        assert!(plan.is_noop());
        assert_eq!(plan.uncovered, 0.0);
    }

    #[test]
    fn no_filled_segment_leaves_everything_uncovered() {
        let slots = [SlotFill::partial(3.0), SlotFill::empty()];
        let plan = backfill(10.0, &slots);
        assert!(plan.is_noop());
        assert!(approx(plan.uncovered, 7.0));
    }
}
