//! Intensity curve synthesis.
//!
//! # Responsibility
//! - Map elapsed hours onto a 0..=100 intensity for one duration curve.
//! - Sample that mapping into a finite, time-sorted point sequence.
//!
//! # Invariants
//! - Synthesis is pure; calling it twice with the same input yields the
//!   same points.
//! - Output is sorted by time and free of near-duplicate time points.
//! - Output spans exactly `[0, total_hours]`.
//! - With boundary injection every in-range phase boundary is emitted at
//!   its exact time; dedup never trades a boundary for an even sample.
//! - The whole peak window, degenerate or not, sits at full intensity.
//! - Degenerate input (non-positive total, empty curve) yields no points.

use crate::model::curve::DurationCurve;
use serde::{Deserialize, Serialize};

pub const MAX_INTENSITY: f64 = 100.0;
const ONSET_CEILING: f64 = 50.0;
const GAP_RISE_CEILING: f64 = 95.0;
const OFFSET_FLOOR: f64 = 30.0;
const MIN_SPAN_HOURS: f64 = 1e-9;
const DEDUP_RELATIVE_EPSILON: f64 = 1e-6;
const MIN_POINT_COUNT: usize = 2;

/// One sample of an intensity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityPoint {
    pub time_hours: f64,
    pub intensity: f64,
}

/// How sample times are spread over the curve span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingStrategy {
    /// Even spacing plus an explicit point at every phase boundary.
    BoundaryInjected,
    /// Spacing warped by `fraction^exponent`, denser near time zero.
    EarlyWarped { exponent: f64 },
}

/// Intensity at `t` hours after administration.
pub fn intensity_at(curve: &DurationCurve, t: f64) -> f64 {
    let onset = curve.onset;
    let peak = curve.peak;
    let offset = curve.offset;
    let after = curve.after_effects;

    if t < onset.start {
        0.0
    } else if peak.start <= t && t <= peak.end {
        MAX_INTENSITY
    } else if t <= onset.end {
        ONSET_CEILING * ease_in_cubic(phase_fraction(t, onset.start, onset.end))
    } else if t < peak.start {
        ONSET_CEILING
            + (GAP_RISE_CEILING - ONSET_CEILING) * phase_fraction(t, onset.end, peak.start)
    } else if t < offset.start {
        MAX_INTENSITY
    } else if t <= offset.end {
        MAX_INTENSITY
            - (MAX_INTENSITY - OFFSET_FLOOR)
                * ease_in_cubic(phase_fraction(t, offset.start, offset.end))
    } else if t < after.start {
        OFFSET_FLOOR
    } else if t < after.end {
        OFFSET_FLOOR * (1.0 - phase_fraction(t, after.start, after.end))
    } else {
        0.0
    }
}

/// Samples the curve with [`SamplingStrategy::BoundaryInjected`].
pub fn synthesize(
    curve: &DurationCurve,
    total_hours: f64,
    point_count: usize,
) -> Vec<IntensityPoint> {
    synthesize_with(
        curve,
        total_hours,
        point_count,
        SamplingStrategy::BoundaryInjected,
    )
}

/// Samples the curve over `[0, total_hours]` with the given strategy.
pub fn synthesize_with(
    curve: &DurationCurve,
    total_hours: f64,
    point_count: usize,
    strategy: SamplingStrategy,
) -> Vec<IntensityPoint> {
    if !total_hours.is_finite() || total_hours <= 0.0 || curve.is_empty() {
        return Vec::new();
    }

    let count = point_count.max(MIN_POINT_COUNT);
    let last_index = (count - 1) as f64;
    let mut samples: Vec<(f64, SampleKind)> = (0..count)
        .map(|index| {
            let fraction = index as f64 / last_index;
            let warped = match strategy {
                SamplingStrategy::BoundaryInjected => fraction,
                SamplingStrategy::EarlyWarped { exponent } if exponent > 0.0 => {
                    fraction.powf(exponent)
                }
                SamplingStrategy::EarlyWarped { .. } => fraction,
            };
            let kind = if index == 0 || index == count - 1 {
                SampleKind::Endpoint
            } else {
                SampleKind::Even
            };
            (total_hours * warped, kind)
        })
        .collect();

    if strategy == SamplingStrategy::BoundaryInjected {
        samples.extend(
            curve
                .boundaries()
                .iter()
                .copied()
                .filter(|boundary| boundary.is_finite() && (0.0..=total_hours).contains(boundary))
                .map(|boundary| (boundary, SampleKind::Boundary)),
        );
    }

    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    dedup_samples(samples, dedup_epsilon(total_hours))
        .into_iter()
        .map(|time_hours| IntensityPoint {
            time_hours,
            intensity: intensity_at(curve, time_hours),
        })
        .collect()
}

/// Translates points along the time axis.
pub fn shift_points(points: &[IntensityPoint], offset_hours: f64) -> Vec<IntensityPoint> {
    points
        .iter()
        .map(|point| IntensityPoint {
            time_hours: point.time_hours + offset_hours,
            intensity: point.intensity,
        })
        .collect()
}

fn ease_in_cubic(fraction: f64) -> f64 {
    fraction * fraction * fraction
}

fn phase_fraction(t: f64, start: f64, end: f64) -> f64 {
    let span = (end - start).max(MIN_SPAN_HOURS);
    ((t - start) / span).clamp(0.0, 1.0)
}

fn dedup_epsilon(total_hours: f64) -> f64 {
    (total_hours * DEDUP_RELATIVE_EPSILON).max(MIN_SPAN_HOURS)
}

/// Ranks sample times when two fall within the dedup epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SampleKind {
    Even,
    Boundary,
    Endpoint,
}

/// Collapses near-duplicate times, keeping the highest-ranked time of each
/// cluster. Ties keep the earlier time.
fn dedup_samples(samples: Vec<(f64, SampleKind)>, epsilon: f64) -> Vec<f64> {
    let mut kept: Vec<(f64, SampleKind)> = Vec::with_capacity(samples.len());
    for (time, kind) in samples {
        match kept.last_mut() {
            Some(last) if time - last.0 <= epsilon => {
                if kind > last.1 {
                    *last = (time, kind);
                }
            }
            _ => kept.push((time, kind)),
        }
    }
    kept.into_iter().map(|(time, _)| time).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        intensity_at, shift_points, synthesize, synthesize_with, IntensityPoint,
        SamplingStrategy, MAX_INTENSITY,
    };
    use crate::model::curve::DurationCurve;

    fn gapped_curve() -> DurationCurve {
        DurationCurve::from_hours((0.5, 1.0), (1.5, 3.0), (4.0, 5.0), (6.0, 8.0))
    }

    #[test]
    fn piecewise_shape_matches_phase_rules() {
        let curve = gapped_curve();
        assert_eq!(intensity_at(&curve, 0.25), 0.0);
        assert_eq!(intensity_at(&curve, 0.5), 0.0);
        assert_eq!(intensity_at(&curve, 1.0), 50.0);
        assert!((intensity_at(&curve, 1.25) - 72.5).abs() < 1e-9);
        assert_eq!(intensity_at(&curve, 2.0), MAX_INTENSITY);
        assert_eq!(intensity_at(&curve, 3.5), MAX_INTENSITY);
        assert_eq!(intensity_at(&curve, 5.0), 30.0);
        assert_eq!(intensity_at(&curve, 5.5), 30.0);
        assert_eq!(intensity_at(&curve, 7.0), 15.0);
        assert_eq!(intensity_at(&curve, 8.0), 0.0);
        assert_eq!(intensity_at(&curve, 12.0), 0.0);
    }

    #[test]
    fn onset_and_offset_use_cubic_easing() {
        let curve = DurationCurve::from_hours((0.0, 2.0), (2.0, 3.0), (3.0, 5.0), (5.0, 6.0));
        assert!((intensity_at(&curve, 1.0) - 50.0 * 0.125).abs() < 1e-9);
        assert!((intensity_at(&curve, 4.0) - (100.0 - 70.0 * 0.125)).abs() < 1e-9);
    }

    #[test]
    fn boundary_injection_hits_every_transition() {
        let curve = gapped_curve();
        let points = synthesize(&curve, 8.0, 5);
        for boundary in curve.boundaries() {
            assert!(
                points.iter().any(|p| p.time_hours == boundary),
                "missing boundary {boundary}"
            );
        }
        assert_eq!(points.first().map(|p| p.time_hours), Some(0.0));
        assert_eq!(points.last().map(|p| p.time_hours), Some(8.0));
    }

    #[test]
    fn boundary_wins_over_nearby_even_sample() {
        // 3.0 * (3 / 10) lands a hair below the 0.9 boundary.
        let curve = DurationCurve::from_hours((0.0, 0.5), (0.9, 0.9), (0.9, 2.0), (2.0, 3.0));
        let points = synthesize(&curve, 3.0, 11);
        for boundary in curve.boundaries() {
            let hits = points.iter().filter(|p| p.time_hours == boundary).count();
            assert_eq!(hits, 1, "boundary {boundary} emitted {hits} times");
        }
        assert!(points
            .iter()
            .all(|p| p.time_hours == 0.9 || (p.time_hours - 0.9).abs() > 1e-6));
        assert_eq!(points.last().map(|p| p.time_hours), Some(3.0));
    }

    #[test]
    fn degenerate_peak_window_reaches_full_intensity() {
        let curve = DurationCurve::from_hours((0.0, 1.0), (1.0, 1.0), (1.0, 4.0), (4.0, 5.32));
        assert_eq!(intensity_at(&curve, 1.0), MAX_INTENSITY);
        assert!(synthesize(&curve, 5.32, 50)
            .iter()
            .any(|p| p.time_hours == 1.0 && p.intensity == MAX_INTENSITY));
    }

    #[test]
    fn points_are_sorted_and_deduplicated() {
        let curve = DurationCurve::from_hours((0.0, 1.0), (1.0, 2.0), (2.0, 4.0), (4.0, 6.0));
        let points = synthesize(&curve, 6.0, 7);
        for pair in points.windows(2) {
            assert!(pair[1].time_hours > pair[0].time_hours);
        }
        let at_one = points.iter().filter(|p| p.time_hours == 1.0).count();
        assert_eq!(at_one, 1);
    }

    #[test]
    fn early_warp_concentrates_samples_near_zero() {
        let curve = gapped_curve();
        let points = synthesize_with(
            &curve,
            8.0,
            11,
            SamplingStrategy::EarlyWarped { exponent: 2.5 },
        );
        assert_eq!(points.len(), 11);
        let early = points.iter().filter(|p| p.time_hours < 4.0).count();
        assert!(early > 5);
        assert_eq!(points.last().map(|p| p.time_hours), Some(8.0));
    }

    #[test]
    fn degenerate_input_yields_nothing() {
        let curve = gapped_curve();
        assert!(synthesize(&curve, 0.0, 50).is_empty());
        assert!(synthesize(&curve, -3.0, 50).is_empty());
        assert!(synthesize(&curve, f64::NAN, 50).is_empty());
        assert!(synthesize(&DurationCurve::default(), 8.0, 50).is_empty());
    }

    #[test]
    fn synthesis_is_repeatable() {
        let curve = gapped_curve();
        assert_eq!(synthesize(&curve, 8.0, 40), synthesize(&curve, 8.0, 40));
    }

    #[test]
    fn shift_translates_time_only() {
        let points = vec![IntensityPoint {
            time_hours: 1.0,
            intensity: 42.0,
        }];
        let shifted = shift_points(&points, 2.0);
        assert_eq!(shifted[0].time_hours, 3.0);
        assert_eq!(shifted[0].intensity, 42.0);
    }
}
