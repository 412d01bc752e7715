//! Dose domain model.
//!
//! # Responsibility
//! - Define the canonical record for one logged administration.
//! - Normalize amounts to the internal unit set (`mg` or `ml`).
//!
//! # Invariants
//! - `id` is stable and never reused for another dose.
//! - `amount` is finite and strictly positive.
//! - `peak_at` requires `onset_at`; `offset_at` requires `peak_at`.
//! - The timeline engine only reads doses; it never mutates them.

use crate::model::route::Route;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a logged dose.
pub type DoseId = Uuid;

/// Stable identifier for a note attached to a dose.
pub type NoteId = Uuid;

/// Unit accepted on input (before normalization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputUnit {
    Mg,
    Ug,
    G,
    Ml,
}

impl InputUnit {
    /// Parses a unit token (`mg|ug|g|ml`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mg" => Some(Self::Mg),
            "ug" | "µg" | "mcg" => Some(Self::Ug),
            "g" => Some(Self::G),
            "ml" => Some(Self::Ml),
            _ => None,
        }
    }

    /// Converts an amount in this unit to the internal storage unit.
    pub fn normalize(self, amount: f64) -> (f64, DoseUnit) {
        match self {
            Self::Mg => (amount, DoseUnit::Mg),
            Self::Ug => (amount / 1000.0, DoseUnit::Mg),
            Self::G => (amount * 1000.0, DoseUnit::Mg),
            Self::Ml => (amount, DoseUnit::Ml),
        }
    }
}

/// Internal storage unit. Mass is always milligrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseUnit {
    Mg,
    Ml,
}

impl DoseUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mg => "mg",
            Self::Ml => "ml",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mg" => Some(Self::Mg),
            "ml" => Some(Self::Ml),
            _ => None,
        }
    }
}

impl Display for DoseUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text note attached to a dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseNote {
    pub id: NoteId,
    pub body: String,
    pub noted_at: DateTime<Utc>,
}

/// One logged administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub id: DoseId,
    /// Lowercased substance name as entered.
    pub substance: String,
    /// Amount in `unit`; always > 0.
    pub amount: f64,
    pub unit: DoseUnit,
    pub route: Route,
    /// Instant the dose was taken.
    pub timestamp: DateTime<Utc>,
    /// User-recorded onset marker.
    pub onset_at: Option<DateTime<Utc>>,
    /// User-recorded peak marker. Requires `onset_at`.
    pub peak_at: Option<DateTime<Utc>>,
    /// User-recorded offset marker. Requires `peak_at`.
    pub offset_at: Option<DateTime<Utc>>,
    /// Notes ordered by `noted_at` ascending.
    pub notes: Vec<DoseNote>,
}

impl DoseEvent {
    /// Creates a dose with a generated id and no markers or notes.
    ///
    /// The substance is trimmed and lowercased; the amount is normalized to
    /// `mg` or `ml`.
    pub fn new(
        substance: impl AsRef<str>,
        amount: f64,
        unit: InputUnit,
        route: Route,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), substance, amount, unit, route, timestamp)
    }

    /// Creates a dose with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: DoseId,
        substance: impl AsRef<str>,
        amount: f64,
        unit: InputUnit,
        route: Route,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (amount, unit) = unit.normalize(amount);
        Self {
            id,
            substance: normalize_substance(substance.as_ref()),
            amount,
            unit,
            route,
            timestamp,
            onset_at: None,
            peak_at: None,
            offset_at: None,
            notes: Vec::new(),
        }
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), DoseValidationError> {
        if self.substance.trim().is_empty() {
            return Err(DoseValidationError::EmptySubstance);
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(DoseValidationError::NonPositiveAmount(self.amount));
        }
        if self.peak_at.is_some() && self.onset_at.is_none() {
            return Err(DoseValidationError::PeakWithoutOnset);
        }
        if self.offset_at.is_some() && self.peak_at.is_none() {
            return Err(DoseValidationError::OffsetWithoutPeak);
        }
        Ok(())
    }

    /// Hours elapsed between `timestamp` and `now` (negative for future doses).
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        hours_between(self.timestamp, now)
    }
}

/// Write-path validation failures for [`DoseEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum DoseValidationError {
    EmptySubstance,
    NonPositiveAmount(f64),
    PeakWithoutOnset,
    OffsetWithoutPeak,
}

impl Display for DoseValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubstance => write!(f, "substance cannot be empty"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "amount must be a positive number, got {amount}")
            }
            Self::PeakWithoutOnset => write!(f, "peak marker requires an onset marker"),
            Self::OffsetWithoutPeak => write!(f, "offset marker requires a peak marker"),
        }
    }
}

impl Error for DoseValidationError {}

/// Trims and lowercases a substance name.
pub fn normalize_substance(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Signed hours from `from` to `to`, at millisecond precision.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}
