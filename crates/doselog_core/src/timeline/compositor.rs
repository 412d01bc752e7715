//! Multi-dose composition on a shared timeline.
//!
//! # Responsibility
//! - Decide which doses are still active at an injected `now`.
//! - Align active doses on one time origin (the earliest active dose).
//! - Build per-dose intensity series in local time, then translate them.
//!
//! # Invariants
//! - Stateless: every call recomputes the whole active set from its inputs.
//! - A dose without a usable curve contributes nothing; it is never an error.
//! - A dose is active while `0 <= elapsed < after_effects.end * 1.33`.

use crate::model::curve::DurationCurve;
use crate::model::dose::{hours_between, DoseEvent, DoseId};
use crate::reference::library::CurveLookup;
use crate::timeline::axis::{PhaseTick, ScaledPoint, TimelineAxis};
use crate::timeline::intensity::{shift_points, synthesize_with, IntensityPoint, SamplingStrategy};
use crate::timeline::phase::{classify, Phase};
use crate::timeline::scale::AxisScale;
use chrono::{DateTime, Utc};
use log::debug;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A dose that is still within its grace period at `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveExperience {
    pub dose: DoseEvent,
    pub curve: DurationCurve,
    pub elapsed_hours: f64,
    pub phase: Phase,
    /// Hours between the earliest active dose and this one.
    pub offset_from_earliest_hours: f64,
    pub color: String,
}

/// Active doses at `now`, earliest first, colored by [`substance_color`].
pub fn compose_active<L>(now: DateTime<Utc>, doses: &[DoseEvent], lookup: &L) -> Vec<ActiveExperience>
where
    L: CurveLookup + ?Sized,
{
    compose_active_with(now, doses, lookup, substance_color)
}

/// Same as [`compose_active`] with a caller-supplied color assignment.
pub fn compose_active_with<L, F>(
    now: DateTime<Utc>,
    doses: &[DoseEvent],
    lookup: &L,
    color_for: F,
) -> Vec<ActiveExperience>
where
    L: CurveLookup + ?Sized,
    F: Fn(&str) -> String,
{
    let mut without_curve = 0_usize;
    let mut active: Vec<(&DoseEvent, DurationCurve, f64)> = Vec::new();

    for dose in doses {
        let curve = match lookup.resolve(&dose.substance, dose.route.as_str()) {
            Some(curve) if !curve.is_empty() => curve,
            _ => {
                without_curve += 1;
                continue;
            }
        };
        let elapsed_hours = hours_between(dose.timestamp, now);
        if elapsed_hours >= 0.0 && elapsed_hours < curve.grace_end_hours() {
            active.push((dose, curve, elapsed_hours));
        }
    }

    active.sort_by(|(left, _, _), (right, _, _)| {
        left.timestamp
            .cmp(&right.timestamp)
            .then_with(|| left.id.cmp(&right.id))
    });

    let Some(origin) = active.first().map(|(dose, _, _)| dose.timestamp) else {
        debug!(
            "event=compose_active module=timeline status=ok candidates={} active=0 without_curve={}",
            doses.len(),
            without_curve
        );
        return Vec::new();
    };

    let experiences: Vec<ActiveExperience> = active
        .into_iter()
        .map(|(dose, curve, elapsed_hours)| ActiveExperience {
            phase: classify(elapsed_hours, &curve),
            offset_from_earliest_hours: hours_between(origin, dose.timestamp),
            color: color_for(&dose.substance),
            dose: dose.clone(),
            curve,
            elapsed_hours,
        })
        .collect();

    debug!(
        "event=compose_active module=timeline status=ok candidates={} active={} without_curve={}",
        doses.len(),
        experiences.len(),
        without_curve
    );
    experiences
}

/// Deterministic HSL color for a substance name (FNV-1a over its bytes).
pub fn substance_color(substance: &str) -> String {
    let normalized = substance.trim().to_lowercase();
    let hash = normalized.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    let hue = hash % 360;
    format!("hsl({hue}, 70%, 55%)")
}

/// One dose's curve placed on the shared axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceSeries {
    pub dose_id: DoseId,
    pub substance: String,
    pub color: String,
    pub phase: Phase,
    pub offset_from_earliest_hours: f64,
    /// Points in shared-axis hours (local time + offset).
    pub points: Vec<IntensityPoint>,
    pub scaled: Vec<ScaledPoint>,
    pub ticks: Vec<PhaseTick>,
}

/// All active experiences rendered against one origin and one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedTimeline {
    pub origin: Option<DateTime<Utc>>,
    pub axis: TimelineAxis,
    /// `now` in shared-axis hours.
    pub now_hours: f64,
    pub series: Vec<ExperienceSeries>,
}

impl SharedTimeline {
    /// Builds display series for composed experiences.
    ///
    /// The span is the latest `offset + after_effects.end` over all
    /// experiences. Each curve is synthesized over its own local span and then
    /// shifted by its offset.
    pub fn build(
        now: DateTime<Utc>,
        experiences: &[ActiveExperience],
        scale: AxisScale,
        strategy: SamplingStrategy,
        point_count: usize,
    ) -> Self {
        let total_hours = shared_span_hours(experiences);
        let axis = TimelineAxis::new(scale, total_hours);
        let origin = experiences
            .iter()
            .map(|experience| experience.dose.timestamp)
            .min();
        let now_hours = origin.map_or(0.0, |origin| hours_between(origin, now));

        let series = experiences
            .iter()
            .map(|experience| {
                let local = synthesize_with(
                    &experience.curve,
                    experience.curve.after_effects.end,
                    point_count,
                    strategy,
                );
                let points = shift_points(&local, experience.offset_from_earliest_hours);
                ExperienceSeries {
                    dose_id: experience.dose.id,
                    substance: experience.dose.substance.clone(),
                    color: experience.color.clone(),
                    phase: experience.phase,
                    offset_from_earliest_hours: experience.offset_from_earliest_hours,
                    scaled: axis.project(&points),
                    ticks: axis.phase_ticks(&experience.curve, experience.offset_from_earliest_hours),
                    points,
                }
            })
            .collect();

        Self {
            origin,
            axis,
            now_hours,
            series,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.axis.total_hours
    }

    /// Horizontal position of the `now` marker.
    pub fn now_x(&self) -> f64 {
        self.axis.position(self.now_hours)
    }
}

/// One dose's curve on its own single-experience axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTimeline {
    pub axis: TimelineAxis,
    pub points: Vec<IntensityPoint>,
    pub scaled: Vec<ScaledPoint>,
    pub ticks: Vec<PhaseTick>,
}

impl SingleTimeline {
    /// Spans `[0, after_effects.end]` with boundary-injected sampling.
    /// An empty curve yields no points and no ticks.
    pub fn build(curve: &DurationCurve, scale: AxisScale, point_count: usize) -> Self {
        let total_hours = curve.after_effects.end.max(0.0);
        let axis = TimelineAxis::new(scale, total_hours);
        let points = synthesize_with(
            curve,
            total_hours,
            point_count,
            SamplingStrategy::BoundaryInjected,
        );
        let ticks = if points.is_empty() {
            Vec::new()
        } else {
            axis.phase_ticks(curve, 0.0)
        };
        debug!(
            "event=single_timeline module=timeline status=ok span_hours={total_hours} points={}",
            points.len()
        );
        Self {
            axis,
            scaled: axis.project(&points),
            points,
            ticks,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.axis.total_hours
    }
}

/// `max(offset + after_effects.end)` over the experiences, or `0`.
pub fn shared_span_hours(experiences: &[ActiveExperience]) -> f64 {
    experiences
        .iter()
        .map(|experience| experience.offset_from_earliest_hours + experience.curve.after_effects.end)
        .fold(0.0, f64::max)
}
