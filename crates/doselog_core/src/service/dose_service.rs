//! Dose journal use-case service.
//!
//! # Responsibility
//! - Log doses from shorthand strings or explicit fields.
//! - Record phase markers in order and manage dose notes.
//! - Feed the stored journal into the timeline compositor and statistics.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Marker order is `taken_at <= onset <= peak <= offset`.
//! - Log lines carry ids and routes only, never substances or note bodies.

use crate::model::dose::{DoseEvent, DoseId, DoseNote, DoseValidationError, InputUnit, NoteId};
use crate::model::route::Route;
use crate::parse::dose_string::{parse_dose_string, DoseParseError};
use crate::reference::library::CurveLookup;
use crate::repo::dose_repo::{DoseRepository, PhaseMarkers, RepoError};
use crate::service::dose_stats::{DoseFilter, DoseSummary};
use crate::timeline::compositor::{compose_active, ActiveExperience};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// User-recordable phase marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Onset,
    Peak,
    Offset,
}

impl MarkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Onset => "onset",
            Self::Peak => "peak",
            Self::Offset => "offset",
        }
    }
}

impl Display for MarkerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service error for dose use-cases.
#[derive(Debug)]
pub enum DoseServiceError {
    Parse(DoseParseError),
    Validation(DoseValidationError),
    DoseNotFound(DoseId),
    NoteNotFound(NoteId),
    /// Marker would break `taken_at <= onset <= peak <= offset`.
    MarkerOutOfOrder {
        marker: MarkerKind,
        reason: &'static str,
    },
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for DoseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DoseNotFound(id) => write!(f, "dose not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::MarkerOutOfOrder { marker, reason } => {
                write!(f, "cannot record {marker} marker: {reason}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent dose state: {details}"),
        }
    }
}

impl Error for DoseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DoseParseError> for DoseServiceError {
    fn from(value: DoseParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<RepoError> for DoseServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::DoseNotFound(id),
            RepoError::NoteNotFound(id) => Self::NoteNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, DoseServiceError>;

/// Dose service facade over repository implementations.
pub struct DoseService<R: DoseRepository> {
    repo: R,
}

impl<R: DoseRepository> DoseService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Parses shorthand input and stores the resulting dose.
    pub fn log_dose_string(&self, input: &str, taken_at: DateTime<Utc>) -> ServiceResult<DoseEvent> {
        let dose = parse_dose_string(input)?.into_dose(taken_at);
        self.store(dose)
    }

    /// Stores a dose from explicit fields.
    ///
    /// An unrecognized route is recorded as `other`.
    pub fn log_dose(
        &self,
        substance: &str,
        amount: f64,
        unit: InputUnit,
        route: &str,
        taken_at: DateTime<Utc>,
    ) -> ServiceResult<DoseEvent> {
        let resolved = Route::from_alias(route).unwrap_or_else(|| {
            warn!("event=dose_log module=service status=fallback route=other");
            Route::Other
        });
        self.store(DoseEvent::new(substance, amount, unit, resolved, taken_at))
    }

    fn store(&self, dose: DoseEvent) -> ServiceResult<DoseEvent> {
        let id = self.repo.create_dose(&dose)?;
        info!(
            "event=dose_log module=service status=ok dose_id={} route={}",
            id, dose.route
        );
        self.repo
            .get_dose(id)?
            .ok_or(DoseServiceError::InconsistentState(
                "created dose not found in read-back",
            ))
    }

    pub fn get_dose(&self, id: DoseId) -> ServiceResult<Option<DoseEvent>> {
        Ok(self.repo.get_dose(id)?)
    }

    /// Full journal, oldest first.
    pub fn list_doses(&self) -> ServiceResult<Vec<DoseEvent>> {
        Ok(self.repo.list_doses()?)
    }

    pub fn delete_dose(&self, id: DoseId) -> ServiceResult<()> {
        self.repo.delete_dose(id)?;
        info!("event=dose_delete module=service status=ok dose_id={id}");
        Ok(())
    }

    pub fn record_onset(&self, id: DoseId, at: DateTime<Utc>) -> ServiceResult<DoseEvent> {
        self.record_marker(id, MarkerKind::Onset, at)
    }

    pub fn record_peak(&self, id: DoseId, at: DateTime<Utc>) -> ServiceResult<DoseEvent> {
        self.record_marker(id, MarkerKind::Peak, at)
    }

    pub fn record_offset(&self, id: DoseId, at: DateTime<Utc>) -> ServiceResult<DoseEvent> {
        self.record_marker(id, MarkerKind::Offset, at)
    }

    /// Sets one phase marker, replacing any earlier value of that marker.
    pub fn record_marker(
        &self,
        id: DoseId,
        marker: MarkerKind,
        at: DateTime<Utc>,
    ) -> ServiceResult<DoseEvent> {
        let dose = self
            .repo
            .get_dose(id)?
            .ok_or(DoseServiceError::DoseNotFound(id))?;
        let mut markers = PhaseMarkers::of(&dose);
        let out_of_order = |reason| DoseServiceError::MarkerOutOfOrder { marker, reason };

        match marker {
            MarkerKind::Onset => {
                if at < dose.timestamp {
                    return Err(out_of_order("onset precedes the dose"));
                }
                if markers.peak_at.is_some_and(|peak| at > peak) {
                    return Err(out_of_order("onset follows the recorded peak"));
                }
                markers.onset_at = Some(at);
            }
            MarkerKind::Peak => {
                let onset = markers
                    .onset_at
                    .ok_or_else(|| out_of_order("onset is not recorded"))?;
                if at < onset {
                    return Err(out_of_order("peak precedes the recorded onset"));
                }
                if markers.offset_at.is_some_and(|offset| at > offset) {
                    return Err(out_of_order("peak follows the recorded offset"));
                }
                markers.peak_at = Some(at);
            }
            MarkerKind::Offset => {
                let peak = markers
                    .peak_at
                    .ok_or_else(|| out_of_order("peak is not recorded"))?;
                if at < peak {
                    return Err(out_of_order("offset precedes the recorded peak"));
                }
                markers.offset_at = Some(at);
            }
        }

        self.repo.update_phase_markers(id, &markers)?;
        info!(
            "event=dose_mark module=service status=ok dose_id={} marker={}",
            id, marker
        );
        self.repo
            .get_dose(id)?
            .ok_or(DoseServiceError::InconsistentState(
                "marked dose not found in read-back",
            ))
    }

    /// Attaches a note to a dose.
    pub fn add_note(
        &self,
        dose_id: DoseId,
        body: impl Into<String>,
        noted_at: DateTime<Utc>,
    ) -> ServiceResult<DoseNote> {
        let note = DoseNote {
            id: Uuid::new_v4(),
            body: body.into(),
            noted_at,
        };
        self.repo.add_note(dose_id, &note)?;
        info!(
            "event=note_add module=service status=ok dose_id={} note_id={}",
            dose_id, note.id
        );
        Ok(note)
    }

    pub fn update_note(&self, note_id: NoteId, body: &str) -> ServiceResult<()> {
        Ok(self.repo.update_note(note_id, body)?)
    }

    pub fn delete_note(&self, note_id: NoteId) -> ServiceResult<()> {
        Ok(self.repo.delete_note(note_id)?)
    }

    /// Doses still inside their grace period at `now`, earliest first.
    pub fn active_experiences<L>(
        &self,
        now: DateTime<Utc>,
        lookup: &L,
    ) -> ServiceResult<Vec<ActiveExperience>>
    where
        L: CurveLookup + ?Sized,
    {
        let doses = self.repo.list_doses()?;
        Ok(compose_active(now, &doses, lookup))
    }

    /// Statistics over the filtered journal.
    pub fn summarize(&self, filter: &DoseFilter) -> ServiceResult<DoseSummary> {
        let doses = self.repo.list_doses()?;
        Ok(DoseSummary::from_doses(filter.apply(&doses)))
    }
}
