//! Phase classification for elapsed time.

use crate::model::curve::DurationCurve;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Where a point in time falls on a substance timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Onset,
    Peak,
    Offset,
    After,
    Complete,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Onset => "onset",
            Self::Peak => "peak",
            Self::Offset => "offset",
            Self::After => "after",
            Self::Complete => "complete",
        }
    }

    /// Collapses `Complete` into `After` for four-phase displays.
    pub fn display_phase(self) -> Self {
        match self {
            Self::Complete => Self::After,
            other => other,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies `elapsed_hours` against each phase's end, first match wins.
///
/// Only ends are compared. A curve whose ends are not non-decreasing gets a
/// deterministic but meaningless answer; ordering is not checked here.
pub fn classify(elapsed_hours: f64, curve: &DurationCurve) -> Phase {
    if elapsed_hours < curve.onset.end {
        Phase::Onset
    } else if elapsed_hours < curve.peak.end {
        Phase::Peak
    } else if elapsed_hours < curve.offset.end {
        Phase::Offset
    } else if elapsed_hours < curve.after_effects.end {
        Phase::After
    } else {
        Phase::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Phase};
    use crate::model::curve::DurationCurve;

    fn sample_curve() -> DurationCurve {
        DurationCurve::from_hours((0.0, 1.0), (1.0, 2.0), (2.0, 4.0), (4.0, 6.0))
    }

    #[test]
    fn classifies_each_phase_in_order() {
        let curve = sample_curve();
        let phases: Vec<Phase> = [0.5, 1.5, 3.0, 5.0, 7.0]
            .iter()
            .map(|hours| classify(*hours, &curve))
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::Onset,
                Phase::Peak,
                Phase::Offset,
                Phase::After,
                Phase::Complete
            ]
        );
    }

    #[test]
    fn boundaries_belong_to_the_next_phase() {
        let curve = sample_curve();
        assert_eq!(classify(1.0, &curve), Phase::Peak);
        assert_eq!(classify(6.0, &curve), Phase::Complete);
        assert_eq!(classify(-1.0, &curve), Phase::Onset);
    }

    #[test]
    fn unordered_curve_is_still_deterministic() {
        let curve = DurationCurve::from_hours((0.0, 3.0), (0.5, 1.0), (1.0, 2.0), (2.0, 5.0));
        assert_eq!(classify(2.5, &curve), Phase::Onset);
        assert_eq!(classify(2.5, &curve), classify(2.5, &curve));
    }

    #[test]
    fn complete_collapses_for_display() {
        assert_eq!(Phase::Complete.display_phase(), Phase::After);
        assert_eq!(Phase::Peak.display_phase(), Phase::Peak);
    }
}
