//! Journal filtering and summary statistics.
//!
//! # Responsibility
//! - Narrow a dose snapshot by substance, route, year, date range and count.
//! - Aggregate totals per substance and route plus average/median amounts.
//!
//! # Invariants
//! - Filters never mutate the snapshot; they return borrowed views.
//! - Filter stages run in a fixed order: substances, routes, year, range,
//!   then last `n`.
//! - Empty input yields zero totals and `None` for the last dose.

use crate::model::dose::{normalize_substance, DoseEvent};
use crate::model::route::Route;
use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::BTreeMap;

/// Substance -> route -> summed amount.
pub type DoseTally = BTreeMap<String, BTreeMap<Route, f64>>;

/// Composable journal filter. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoseFilter {
    pub substances: Vec<String>,
    pub routes: Vec<Route>,
    pub year: Option<i32>,
    /// Inclusive `[start, end]` window on `timestamp`.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Keep only the latest `n` doses after the other stages.
    pub last: Option<usize>,
}

impl DoseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only<I, S>(mut self, substances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.substances = substances
            .into_iter()
            .map(|substance| normalize_substance(substance.as_ref()))
            .collect();
        self
    }

    pub fn via(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes = routes.into_iter().collect();
        self
    }

    pub fn from_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.range = Some((start, end));
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }

    /// Applies the filter to a snapshot, returning matches oldest first.
    pub fn apply<'a>(&self, doses: &'a [DoseEvent]) -> Vec<&'a DoseEvent> {
        let mut matched: Vec<&DoseEvent> = doses
            .iter()
            .filter(|dose| {
                self.substances.is_empty() || self.substances.contains(&dose.substance)
            })
            .filter(|dose| self.routes.is_empty() || self.routes.contains(&dose.route))
            .filter(|dose| self.year.map_or(true, |year| dose.timestamp.year() == year))
            .filter(|dose| {
                self.range
                    .map_or(true, |(start, end)| start <= dose.timestamp && dose.timestamp <= end)
            })
            .collect();
        matched.sort_by(|left, right| {
            left.timestamp
                .cmp(&right.timestamp)
                .then_with(|| left.id.cmp(&right.id))
        });

        if let Some(n) = self.last {
            let skip = matched.len().saturating_sub(n);
            matched.drain(..skip);
        }
        matched
    }
}

/// Aggregates over a filtered set of doses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoseSummary {
    pub count: usize,
    pub tally: DoseTally,
    pub total: f64,
    pub average: f64,
    pub median: f64,
    pub last_taken_at: Option<DateTime<Utc>>,
}

impl DoseSummary {
    pub fn from_doses<'a>(doses: impl IntoIterator<Item = &'a DoseEvent>) -> Self {
        let mut tally = DoseTally::new();
        let mut amounts = Vec::new();
        let mut last_taken_at: Option<DateTime<Utc>> = None;

        for dose in doses {
            *tally
                .entry(dose.substance.clone())
                .or_default()
                .entry(dose.route)
                .or_insert(0.0) += dose.amount;
            amounts.push(dose.amount);
            last_taken_at = Some(last_taken_at.map_or(dose.timestamp, |last| last.max(dose.timestamp)));
        }

        let total: f64 = amounts.iter().sum();
        let count = amounts.len();
        let average = if count == 0 { 0.0 } else { total / count as f64 };

        Self {
            count,
            tally,
            total,
            average,
            median: median(&mut amounts),
            last_taken_at,
        }
    }

    /// Summed amount of one substance across every route.
    pub fn substance_total(&self, substance: &str) -> f64 {
        self.tally
            .get(&normalize_substance(substance))
            .map_or(0.0, |routes| routes.values().sum())
    }

    /// Time since the latest dose in the summary.
    pub fn time_since_last(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_taken_at.map(|last| now - last)
    }
}

fn median(amounts: &mut [f64]) -> f64 {
    if amounts.is_empty() {
        return 0.0;
    }
    amounts.sort_by(f64::total_cmp);
    let mid = amounts.len() / 2;
    if amounts.len() % 2 == 1 {
        amounts[mid]
    } else {
        (amounts[mid - 1] + amounts[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{DoseFilter, DoseSummary};
    use crate::model::dose::{DoseEvent, InputUnit};
    use crate::model::route::Route;
    use chrono::{Duration, TimeZone, Utc};

    fn journal() -> Vec<DoseEvent> {
        let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
        vec![
            DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(2023, 12, 31)),
            DoseEvent::new("caffeine", 50.0, InputUnit::Mg, Route::Oral, at(2024, 1, 2)),
            DoseEvent::new("ketamine", 25.0, InputUnit::Mg, Route::Insufflation, at(2024, 1, 3)),
            DoseEvent::new("caffeine", 200.0, InputUnit::Mg, Route::Sublingual, at(2024, 2, 1)),
        ]
    }

    #[test]
    fn tally_groups_by_substance_then_route() {
        let doses = journal();
        let summary = DoseSummary::from_doses(&doses);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.total, 375.0);
        assert_eq!(summary.tally["caffeine"][&Route::Oral], 150.0);
        assert_eq!(summary.tally["caffeine"][&Route::Sublingual], 200.0);
        assert_eq!(summary.substance_total("Caffeine"), 350.0);
        assert_eq!(summary.median, 75.0);
        assert_eq!(summary.average, 93.75);
    }

    #[test]
    fn filters_compose_in_order() {
        let doses = journal();
        let filter = DoseFilter::new().only(["CAFFEINE"]).from_year(2024).last(1);
        let matched = filter.apply(&doses);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].amount, 200.0);

        let via = DoseFilter::new().via([Route::Oral]).apply(&doses);
        assert_eq!(via.len(), 2);
    }

    #[test]
    fn range_is_inclusive() {
        let doses = journal();
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let matched = DoseFilter::new().between(start, end).apply(&doses);
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = DoseSummary::from_doses(&[]);
        assert_eq!(summary.average, 0.0);
        assert_eq!(summary.median, 0.0);
        assert!(summary.time_since_last(Utc::now()).is_none());
    }

    #[test]
    fn time_since_last_uses_latest_dose() {
        let doses = journal();
        let summary = DoseSummary::from_doses(&doses);
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        assert_eq!(summary.time_since_last(now), Some(Duration::hours(3)));
    }
}
