//! Duration normalization into canonical hours.
//!
//! # Invariants
//! - Numeric input is already hours and is returned unchanged when finite
//!   and non-negative.
//! - Malformed ISO-8601 strings normalize to `0.0`; this module never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const HOURS_PER_WEEK: f64 = 168.0;
const HOURS_PER_DAY: f64 = 24.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

static ISO_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(\d+(?:[.,]\d+)?)W)?(?:(\d+(?:[.,]\d+)?)D)?(?:T(?:(\d+(?:[.,]\d+)?)H)?(?:(\d+(?:[.,]\d+)?)M)?(?:(\d+(?:[.,]\d+)?)S)?)?$",
    )
    .expect("valid iso duration regex")
});

/// A duration as found in reference data: raw hours or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Hours(f64),
    Iso(String),
}

impl DurationValue {
    pub fn to_hours(&self) -> f64 {
        to_hours(self)
    }
}

impl From<f64> for DurationValue {
    fn from(value: f64) -> Self {
        Self::Hours(value)
    }
}

impl From<&str> for DurationValue {
    fn from(value: &str) -> Self {
        Self::Iso(value.to_string())
    }
}

/// Converts a duration value to hours.
pub fn to_hours(value: &DurationValue) -> f64 {
    match value {
        DurationValue::Hours(hours) if hours.is_finite() && *hours >= 0.0 => *hours,
        DurationValue::Hours(_) => 0.0,
        DurationValue::Iso(text) => iso_to_hours(text),
    }
}

/// Parses a `P[nW][nD][T[nH][nM][nS]]` duration and sums its hour equivalents.
///
/// Missing components count as zero; anything that does not match the
/// grammar yields `0.0`.
pub fn iso_to_hours(text: &str) -> f64 {
    let normalized = text.trim().to_ascii_uppercase();
    let Some(caps) = ISO_DURATION_RE.captures(&normalized) else {
        return 0.0;
    };

    let component = |index: usize| -> f64 {
        caps.get(index)
            .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    component(1) * HOURS_PER_WEEK
        + component(2) * HOURS_PER_DAY
        + component(3)
        + component(4) / MINUTES_PER_HOUR
        + component(5) / SECONDS_PER_HOUR
}

/// Formats an hour count as a single-component ISO-8601 duration (`PT<n>H`).
pub fn hours_to_iso(hours: f64) -> String {
    let hours = if hours.is_finite() && hours > 0.0 {
        hours
    } else {
        0.0
    };
    if hours.fract() == 0.0 {
        format!("PT{}H", hours as u64)
    } else {
        format!("PT{hours}H")
    }
}

/// Resolves one phase boundary.
///
/// The numeric value is authoritative; otherwise the first ISO candidate is
/// used; otherwise the boundary is `0.0`.
pub fn boundary_hours(numeric: Option<f64>, iso_candidates: &[String]) -> f64 {
    match (numeric, iso_candidates.first()) {
        (Some(hours), _) => to_hours(&DurationValue::Hours(hours)),
        (None, Some(iso)) => iso_to_hours(iso),
        (None, None) => 0.0,
    }
}
