//! Reference library of duration curves and its resolver.
//!
//! # Responsibility
//! - Load reference entries in either physical shape (modern or legacy).
//! - Resolve a `(substance, route)` query to one canonical curve.
//!
//! # Invariants
//! - Lookup keys (main name, aliases, route) are computed once at load time.
//! - Resolution is pure: same library + same query = same answer.
//! - Route fallback order is alphabetical by normalized route, then library
//!   order, independent of how the source document was sorted.

use crate::model::curve::{CurveRecord, DurationCurve, LegacyCurveRecord, ModernCurveRecord};
use crate::model::dose::normalize_substance;
use crate::model::route::normalize_route_key;
use crate::reference::substance_name::SubstanceName;
use log::{debug, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Source of duration curves for the timeline engine.
pub trait CurveLookup {
    /// Returns the canonical curve for a substance/route pair, if any.
    fn resolve(&self, substance: &str, route: &str) -> Option<DurationCurve>;
}

/// One library entry with precomputed lookup keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub name: SubstanceName,
    /// Normalized route (see `normalize_route_key`).
    pub route: String,
    pub record: CurveRecord,
}

impl ReferenceEntry {
    pub fn new(substance: &str, route: &str, record: CurveRecord) -> Self {
        Self {
            name: SubstanceName::parse(substance),
            route: normalize_route_key(route),
            record,
        }
    }
}

/// How a query was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMatch {
    ExactRoute,
    AnyRoute,
}

/// Error while loading a reference document.
#[derive(Debug)]
pub enum ReferenceLoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Entry carries neither a `duration_curve` nor legacy `onset/peak/offset`.
    MissingCurve { index: usize, substance: String },
}

impl Display for ReferenceLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read reference library: {err}"),
            Self::Json(err) => write!(f, "invalid reference library document: {err}"),
            Self::MissingCurve { index, substance } => write!(
                f,
                "reference entry {index} (`{substance}`) has no duration curve"
            ),
        }
    }
}

impl Error for ReferenceLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::MissingCurve { .. } => None,
        }
    }
}

impl From<std::io::Error> for ReferenceLoadError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ReferenceLoadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Deserialize)]
struct RawReferenceEntry {
    substance: String,
    route: String,
    #[serde(default)]
    duration_curve: Option<ModernCurveRecord>,
    #[serde(default)]
    onset: Option<f64>,
    #[serde(default)]
    peak: Option<f64>,
    #[serde(default)]
    offset: Option<f64>,
}

impl RawReferenceEntry {
    fn into_record(self, index: usize) -> Result<ReferenceEntry, ReferenceLoadError> {
        let record = match (self.duration_curve, self.onset, self.peak, self.offset) {
            (Some(modern), _, _, _) => CurveRecord::Modern(modern),
            (None, Some(onset), Some(peak), Some(offset)) => {
                CurveRecord::Legacy(LegacyCurveRecord {
                    onset,
                    peak,
                    offset,
                })
            }
            _ => {
                return Err(ReferenceLoadError::MissingCurve {
                    index,
                    substance: self.substance,
                })
            }
        };
        Ok(ReferenceEntry::new(&self.substance, &self.route, record))
    }
}

/// In-memory snapshot of reference curves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceLibrary {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parses a JSON array of reference entries.
    ///
    /// Each entry has `substance`, `route` and either a `duration_curve`
    /// object or flat legacy `onset`/`peak`/`offset` hour marks. Shapes may
    /// be mixed within one document.
    pub fn from_json_str(json: &str) -> Result<Self, ReferenceLoadError> {
        let raw: Vec<RawReferenceEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_record(index))
            .collect::<Result<Vec<_>, _>>()?;

        let legacy_count = entries
            .iter()
            .filter(|entry| matches!(entry.record, CurveRecord::Legacy(_)))
            .count();
        info!(
            "event=reference_load module=reference status=ok entries={} legacy={}",
            entries.len(),
            legacy_count
        );
        Ok(Self { entries })
    }

    /// Reads and parses a JSON reference document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReferenceLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn push(&mut self, entry: ReferenceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry that answers a query, and how it matched.
    ///
    /// Order: exact substance + route, then any route of that substance
    /// (alphabetical by route), then nothing.
    pub fn resolve_entry(
        &self,
        substance: &str,
        route: &str,
    ) -> Option<(&ReferenceEntry, ResolveMatch)> {
        let substance_key = normalize_substance(substance);
        let route_key = normalize_route_key(route);

        let mut candidates = self
            .entries
            .iter()
            .filter(|entry| entry.name.matches(&substance_key))
            .peekable();
        candidates.peek()?;

        let mut fallback: Option<&ReferenceEntry> = None;
        for entry in candidates {
            if entry.route == route_key {
                return Some((entry, ResolveMatch::ExactRoute));
            }
            match fallback {
                Some(current) if current.route <= entry.route => {}
                _ => fallback = Some(entry),
            }
        }
        fallback.map(|entry| (entry, ResolveMatch::AnyRoute))
    }
}

impl CurveLookup for ReferenceLibrary {
    fn resolve(&self, substance: &str, route: &str) -> Option<DurationCurve> {
        match self.resolve_entry(substance, route) {
            Some((entry, matched)) => {
                debug!(
                    "event=reference_resolve module=reference status=ok match={:?} route={}",
                    matched, entry.route
                );
                Some(entry.record.to_curve())
            }
            None => {
                debug!("event=reference_resolve module=reference status=miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CurveLookup, ReferenceEntry, ReferenceLibrary, ResolveMatch};
    use crate::model::curve::{CurveRecord, LegacyCurveRecord};

    fn legacy(onset: f64, peak: f64, offset: f64) -> CurveRecord {
        CurveRecord::Legacy(LegacyCurveRecord {
            onset,
            peak,
            offset,
        })
    }

    #[test]
    fn exact_route_beats_fallback() {
        let library = ReferenceLibrary::from_entries([
            ReferenceEntry::new("Ketamine", "intravenous", legacy(0.1, 0.3, 1.0)),
            ReferenceEntry::new("Ketamine", "insufflation", legacy(0.2, 0.5, 1.5)),
        ]);
        let (entry, matched) = library
            .resolve_entry("ketamine", "snorted")
            .expect("exact match");
        assert_eq!(matched, ResolveMatch::ExactRoute);
        assert_eq!(entry.route, "insufflation");
    }

    #[test]
    fn fallback_is_alphabetical_by_route() {
        let library = ReferenceLibrary::from_entries([
            ReferenceEntry::new("Caffeine", "sublingual", legacy(0.1, 0.5, 3.0)),
            ReferenceEntry::new("Caffeine", "oral", legacy(0.5, 1.0, 4.0)),
            ReferenceEntry::new("Caffeine", "insufflation", legacy(0.2, 0.4, 2.0)),
        ]);
        let (entry, matched) = library
            .resolve_entry("caffeine", "rectal")
            .expect("fallback match");
        assert_eq!(matched, ResolveMatch::AnyRoute);
        assert_eq!(entry.route, "insufflation");
    }

    #[test]
    fn unknown_substance_resolves_to_none() {
        let library = ReferenceLibrary::from_entries([ReferenceEntry::new(
            "Caffeine",
            "oral",
            legacy(0.5, 1.0, 4.0),
        )]);
        assert!(library.resolve("theanine", "oral").is_none());
        assert!(ReferenceLibrary::new().resolve("caffeine", "oral").is_none());
    }

    #[test]
    fn repeated_resolution_is_idempotent() {
        let library = ReferenceLibrary::from_entries([ReferenceEntry::new(
            "Caffeine",
            "oral",
            legacy(0.5, 1.0, 4.0),
        )]);
        assert_eq!(
            library.resolve(" CAFFEINE ", "Oral"),
            library.resolve("caffeine", "oral")
        );
    }
}
