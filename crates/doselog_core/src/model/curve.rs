//! Duration-curve reference model.
//!
//! # Responsibility
//! - Describe the two physical reference shapes (modern structured and
//!   legacy flat) as one tagged input type.
//! - Normalize either shape into the canonical, hours-only [`DurationCurve`].
//!
//! # Invariants
//! - Nothing outside this module branches on the record shape.
//! - Absent boundaries normalize to `0.0`; normalization never fails.
//! - Phase ordering is not validated. Out-of-order data stays deterministic
//!   but may render oddly; curating it is the reference library's job.

use crate::timeline::duration::{boundary_hours, hours_to_iso};
use serde::{Deserialize, Serialize};

/// Multiplier on the nominal after-effects end during which a dose still
/// counts as active. Also the legacy after-effects extension.
pub const GRACE_PERIOD_MULTIPLIER: f64 = 1.33;

/// One phase window as stored in modern reference data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseWindowRecord {
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    /// Candidate ISO strings; only the first one is consulted.
    #[serde(default)]
    pub iso_start: Vec<String>,
    #[serde(default)]
    pub iso_end: Vec<String>,
}

impl PhaseWindowRecord {
    fn from_hours(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            iso_start: vec![hours_to_iso(start)],
            iso_end: vec![hours_to_iso(end)],
        }
    }

    fn normalize(&self) -> PhaseWindow {
        PhaseWindow {
            start: boundary_hours(self.start, &self.iso_start),
            end: boundary_hours(self.end, &self.iso_end),
        }
    }
}

/// Total duration range as stored in modern reference data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationRangeRecord {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub iso_min: Vec<String>,
    #[serde(default)]
    pub iso_max: Vec<String>,
}

/// Modern structured duration curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModernCurveRecord {
    #[serde(default)]
    pub onset: Option<PhaseWindowRecord>,
    #[serde(default)]
    pub peak: Option<PhaseWindowRecord>,
    #[serde(default)]
    pub offset: Option<PhaseWindowRecord>,
    #[serde(default)]
    pub after_effects: Option<PhaseWindowRecord>,
    #[serde(default)]
    pub total_duration: Option<DurationRangeRecord>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

impl ModernCurveRecord {
    /// Normalizes into canonical hours.
    pub fn normalize(&self) -> DurationCurve {
        let window = |record: &Option<PhaseWindowRecord>| {
            record
                .as_ref()
                .map(PhaseWindowRecord::normalize)
                .unwrap_or_default()
        };
        let after_effects = window(&self.after_effects);
        let total_duration = match self.total_duration.as_ref() {
            Some(range) => HoursRange {
                min: boundary_hours(range.min, &range.iso_min),
                max: boundary_hours(range.max, &range.iso_max),
            },
            None => HoursRange {
                min: after_effects.end,
                max: after_effects.end,
            },
        };

        DurationCurve {
            onset: window(&self.onset),
            peak: window(&self.peak),
            offset: window(&self.offset),
            after_effects,
            total_duration,
            reference: self.reference.clone(),
            units: self.units.clone(),
        }
    }
}

/// Legacy flat curve: cumulative hour marks, no after-effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyCurveRecord {
    pub onset: f64,
    pub peak: f64,
    pub offset: f64,
}

impl LegacyCurveRecord {
    /// Synthesizes the modern shape.
    ///
    /// Phases are laid back to back from zero and after-effects run until
    /// `offset * GRACE_PERIOD_MULTIPLIER`.
    pub fn to_modern(&self) -> ModernCurveRecord {
        let after_end = self.offset * GRACE_PERIOD_MULTIPLIER;
        ModernCurveRecord {
            onset: Some(PhaseWindowRecord::from_hours(0.0, self.onset)),
            peak: Some(PhaseWindowRecord::from_hours(self.onset, self.peak)),
            offset: Some(PhaseWindowRecord::from_hours(self.peak, self.offset)),
            after_effects: Some(PhaseWindowRecord::from_hours(self.offset, after_end)),
            total_duration: Some(DurationRangeRecord {
                min: Some(self.offset),
                max: Some(after_end),
                iso_min: vec![hours_to_iso(self.offset)],
                iso_max: vec![hours_to_iso(after_end)],
            }),
            reference: None,
            units: Some("hours".to_string()),
        }
    }
}

/// Reference curve in either physical shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveRecord {
    Modern(ModernCurveRecord),
    Legacy(LegacyCurveRecord),
}

impl CurveRecord {
    /// Normalizes into the canonical curve.
    pub fn to_curve(&self) -> DurationCurve {
        match self {
            Self::Modern(record) => record.normalize(),
            Self::Legacy(record) => record.to_modern().normalize(),
        }
    }
}

/// Phase window in hours since administration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursRange {
    pub min: f64,
    pub max: f64,
}

/// Canonical duration curve used by the timeline engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationCurve {
    pub onset: PhaseWindow,
    pub peak: PhaseWindow,
    pub offset: PhaseWindow,
    pub after_effects: PhaseWindow,
    pub total_duration: HoursRange,
    pub reference: Option<String>,
    pub units: Option<String>,
}

impl DurationCurve {
    /// Builds a curve from `(start, end)` pairs in hours.
    pub fn from_hours(
        onset: (f64, f64),
        peak: (f64, f64),
        offset: (f64, f64),
        after_effects: (f64, f64),
    ) -> Self {
        let window = |(start, end): (f64, f64)| PhaseWindow { start, end };
        Self {
            onset: window(onset),
            peak: window(peak),
            offset: window(offset),
            after_effects: window(after_effects),
            total_duration: HoursRange {
                min: after_effects.1,
                max: after_effects.1,
            },
            reference: None,
            units: Some("hours".to_string()),
        }
    }

    /// All eight phase boundaries in phase order.
    pub fn boundaries(&self) -> [f64; 8] {
        [
            self.onset.start,
            self.onset.end,
            self.peak.start,
            self.peak.end,
            self.offset.start,
            self.offset.end,
            self.after_effects.start,
            self.after_effects.end,
        ]
    }

    /// A curve whose boundaries are all zero carries no information.
    pub fn is_empty(&self) -> bool {
        self.boundaries().iter().all(|value| *value <= 0.0)
    }

    /// Hours after administration until the dose stops counting as active.
    pub fn grace_end_hours(&self) -> f64 {
        self.after_effects.end * GRACE_PERIOD_MULTIPLIER
    }
}
