//! Chart-level axis projection.
//!
//! A [`TimelineAxis`] binds one [`AxisScale`] to one span so gridlines,
//! phase ticks and curve points of a chart all go through the same transform.

use crate::model::curve::DurationCurve;
use crate::timeline::intensity::IntensityPoint;
use crate::timeline::phase::Phase;
use crate::timeline::scale::AxisScale;
use serde::{Deserialize, Serialize};

const GRIDLINE_STEPS_HOURS: &[f64] = &[0.25, 0.5, 1.0, 2.0, 3.0, 6.0, 12.0, 24.0, 48.0, 168.0];
const MAX_AUTO_GRIDLINES: usize = 12;
/// Upper bound on interior gridlines for any requested step.
const MAX_GRIDLINES: usize = 200;

/// Curve point projected to display space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledPoint {
    pub time_hours: f64,
    /// Horizontal position in `[0, 1]`.
    pub x: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gridline {
    pub time_hours: f64,
    pub x: f64,
}

/// Start of a phase window drawn as a tick mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTick {
    pub phase: Phase,
    pub time_hours: f64,
    pub x: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineAxis {
    pub scale: AxisScale,
    pub total_hours: f64,
}

impl TimelineAxis {
    pub fn new(scale: AxisScale, total_hours: f64) -> Self {
        Self { scale, total_hours }
    }

    pub fn position(&self, time_hours: f64) -> f64 {
        self.scale.fraction(time_hours, self.total_hours)
    }

    /// Gridlines every `step_hours`, including both ends of the axis.
    ///
    /// A step finer than `total_hours / MAX_GRIDLINES` is widened to it.
    pub fn gridlines(&self, step_hours: f64) -> Vec<Gridline> {
        if !self.total_hours.is_finite()
            || self.total_hours <= 0.0
            || !step_hours.is_finite()
            || step_hours <= 0.0
        {
            return Vec::new();
        }

        let step_hours = step_hours.max(self.total_hours / MAX_GRIDLINES as f64);
        let mut lines = Vec::with_capacity(MAX_GRIDLINES + 2);
        let mut index = 0_usize;
        loop {
            let time_hours = index as f64 * step_hours;
            if time_hours > self.total_hours {
                break;
            }
            lines.push(Gridline {
                time_hours,
                x: self.position(time_hours),
            });
            index += 1;
        }
        if lines
            .last()
            .is_some_and(|last| last.time_hours < self.total_hours)
        {
            lines.push(Gridline {
                time_hours: self.total_hours,
                x: 1.0,
            });
        }
        lines
    }

    /// Gridlines at the smallest round step that keeps the count readable.
    pub fn auto_gridlines(&self) -> Vec<Gridline> {
        let step = GRIDLINE_STEPS_HOURS
            .iter()
            .copied()
            .find(|step| self.total_hours / step <= MAX_AUTO_GRIDLINES as f64)
            .unwrap_or_else(|| (self.total_hours / MAX_AUTO_GRIDLINES as f64).ceil());
        self.gridlines(step)
    }

    /// Phase starts plus the after-effects end, limited to the axis span.
    ///
    /// `offset_hours` shifts a dose's local curve onto a shared axis.
    pub fn phase_ticks(&self, curve: &DurationCurve, offset_hours: f64) -> Vec<PhaseTick> {
        [
            (Phase::Onset, curve.onset.start),
            (Phase::Peak, curve.peak.start),
            (Phase::Offset, curve.offset.start),
            (Phase::After, curve.after_effects.start),
            (Phase::Complete, curve.after_effects.end),
        ]
        .into_iter()
        .map(|(phase, local)| (phase, local + offset_hours))
        .filter(|(_, time_hours)| time_hours.is_finite() && (0.0..=self.total_hours).contains(time_hours))
        .map(|(phase, time_hours)| PhaseTick {
            phase,
            time_hours,
            x: self.position(time_hours),
        })
        .collect()
    }

    pub fn project(&self, points: &[IntensityPoint]) -> Vec<ScaledPoint> {
        points
            .iter()
            .map(|point| ScaledPoint {
                time_hours: point.time_hours,
                x: self.position(point.time_hours),
                intensity: point.intensity,
            })
            .collect()
    }
}
