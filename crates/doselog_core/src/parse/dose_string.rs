//! Free-text dose shorthand parser.
//!
//! # Responsibility
//! - Turn `"20mg caffeine oral"` or `"@ate 30mg adderall"` into a
//!   structured dose.
//!
//! # Invariants
//! - Keywords (units, routes, verbs) match case-insensitively.
//! - Substances are lowercased; routes resolve through the alias table.
//! - Parsing has no side effects.

use crate::model::dose::{normalize_substance, DoseEvent, DoseUnit, InputUnit};
use crate::model::route::Route;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static STANDARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d*)?)\s*(mg|ug|g|ml)\s+([a-z-]+)\s+([a-z-]+)$")
        .expect("valid standard dose regex")
});
static VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(@\w+)\s+(\d+(?:\.\d*)?)\s*(mg|ug|g|ml)\s+([a-z-]+)$")
        .expect("valid verb dose regex")
});

/// Structured dose extracted from shorthand text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDose {
    pub substance: String,
    /// Amount as typed, in `unit`.
    pub amount: f64,
    pub unit: InputUnit,
    pub route: Route,
}

impl ParsedDose {
    /// Amount converted to the storage unit.
    pub fn normalized_amount(&self) -> (f64, DoseUnit) {
        self.unit.normalize(self.amount)
    }

    /// Builds a new dose taken at `taken_at`.
    pub fn into_dose(self, taken_at: DateTime<Utc>) -> DoseEvent {
        DoseEvent::new(self.substance, self.amount, self.unit, self.route, taken_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DoseParseError {
    /// Input matches neither shorthand form.
    InvalidFormat(String),
    UnknownRoute(String),
    UnknownVerb(String),
    NonPositiveAmount(f64),
}

impl Display for DoseParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(input) => write!(
                f,
                "invalid dose string `{input}`; expected `<amount><unit> <substance> <route>` or `@<verb> <amount><unit> <substance>`"
            ),
            Self::UnknownRoute(route) => {
                write!(f, "unknown route of administration: `{route}`")
            }
            Self::UnknownVerb(verb) => write!(f, "unknown verb command: `{verb}`"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "dose amount must be positive, got {amount}")
            }
        }
    }
}

impl Error for DoseParseError {}

/// Parses one shorthand dose string.
///
/// Accepted forms:
/// - `<amount><unit> <substance> <route>` (`20mg methamphetamine oral`)
/// - `@<verb> <amount><unit> <substance>` (`@sniffed 25mg ketamine`)
pub fn parse_dose_string(input: &str) -> Result<ParsedDose, DoseParseError> {
    let trimmed = input.trim();

    if let Some(caps) = STANDARD_RE.captures(trimmed) {
        let route_word = &caps[4];
        let route = Route::from_alias(route_word)
            .ok_or_else(|| DoseParseError::UnknownRoute(route_word.to_lowercase()))?;
        return build(&caps[1], &caps[2], &caps[3], route);
    }

    if let Some(caps) = VERB_RE.captures(trimmed) {
        let verb = &caps[1];
        let route = Route::from_alias(verb)
            .ok_or_else(|| DoseParseError::UnknownVerb(verb.to_lowercase()))?;
        return build(&caps[2], &caps[3], &caps[4], route);
    }

    Err(DoseParseError::InvalidFormat(trimmed.to_string()))
}

fn build(
    amount: &str,
    unit: &str,
    substance: &str,
    route: Route,
) -> Result<ParsedDose, DoseParseError> {
    let amount: f64 = amount
        .parse()
        .map_err(|_| DoseParseError::InvalidFormat(amount.to_string()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DoseParseError::NonPositiveAmount(amount));
    }
    let unit = InputUnit::parse(unit).ok_or_else(|| DoseParseError::InvalidFormat(unit.to_string()))?;

    Ok(ParsedDose {
        substance: normalize_substance(substance),
        amount,
        unit,
        route,
    })
}
