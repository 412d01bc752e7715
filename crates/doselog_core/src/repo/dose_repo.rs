//! Dose repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over logged doses, their phase markers and notes.
//! - Keep SQL and timestamp encoding inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `DoseEvent::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Instants are stored as Unix epoch milliseconds.
//! - `create_dose` writes the dose row and its notes in one transaction.
//! - `list_doses` is ordered by `taken_at ASC, uuid ASC`; notes by
//!   `noted_at ASC, uuid ASC`.

use crate::db::DbError;
use crate::model::dose::{DoseEvent, DoseId, DoseNote, DoseUnit, DoseValidationError, NoteId};
use crate::model::route::Route;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DOSE_SELECT_SQL: &str = "SELECT
    uuid,
    substance,
    amount,
    unit,
    route,
    taken_at,
    onset_at,
    peak_at,
    offset_at
FROM doses";

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    dose_uuid,
    body,
    noted_at
FROM dose_notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for dose persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(DoseValidationError),
    Db(DbError),
    NotFound(DoseId),
    NoteNotFound(NoteId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "dose not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted dose data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::NoteNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DoseValidationError> for RepoError {
    fn from(value: DoseValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// User-recorded phase markers of one dose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseMarkers {
    pub onset_at: Option<DateTime<Utc>>,
    pub peak_at: Option<DateTime<Utc>>,
    pub offset_at: Option<DateTime<Utc>>,
}

impl PhaseMarkers {
    pub fn of(dose: &DoseEvent) -> Self {
        Self {
            onset_at: dose.onset_at,
            peak_at: dose.peak_at,
            offset_at: dose.offset_at,
        }
    }
}

/// Repository interface for the dose journal.
pub trait DoseRepository {
    fn create_dose(&self, dose: &DoseEvent) -> RepoResult<DoseId>;
    /// Gets one dose with its notes.
    fn get_dose(&self, id: DoseId) -> RepoResult<Option<DoseEvent>>;
    /// Lists every dose with notes, oldest first. No pagination.
    fn list_doses(&self) -> RepoResult<Vec<DoseEvent>>;
    fn update_phase_markers(&self, id: DoseId, markers: &PhaseMarkers) -> RepoResult<()>;
    /// Deletes a dose and, by cascade, its notes.
    fn delete_dose(&self, id: DoseId) -> RepoResult<()>;
    fn add_note(&self, dose_id: DoseId, note: &DoseNote) -> RepoResult<NoteId>;
    fn update_note(&self, note_id: NoteId, body: &str) -> RepoResult<()>;
    fn delete_note(&self, note_id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed dose repository.
pub struct SqliteDoseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDoseRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_notes(&self, dose_uuid: &str) -> RepoResult<Vec<DoseNote>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE dose_uuid = ?1
             ORDER BY noted_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([dose_uuid])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?.1);
        }
        Ok(notes)
    }
}

impl DoseRepository for SqliteDoseRepository<'_> {
    fn create_dose(&self, dose: &DoseEvent) -> RepoResult<DoseId> {
        dose.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO doses (
                uuid,
                substance,
                amount,
                unit,
                route,
                taken_at,
                onset_at,
                peak_at,
                offset_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                dose.id.to_string(),
                dose.substance.as_str(),
                dose.amount,
                dose.unit.as_str(),
                dose.route.as_str(),
                to_epoch_ms(dose.timestamp),
                dose.onset_at.map(to_epoch_ms),
                dose.peak_at.map(to_epoch_ms),
                dose.offset_at.map(to_epoch_ms),
            ],
        )?;
        for note in &dose.notes {
            insert_note(&tx, dose.id, note)?;
        }
        tx.commit()?;

        Ok(dose.id)
    }

    fn get_dose(&self, id: DoseId) -> RepoResult<Option<DoseEvent>> {
        let uuid = id.to_string();
        let mut stmt = self
            .conn
            .prepare(&format!("{DOSE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([uuid.as_str()])?;
        if let Some(row) = rows.next()? {
            let mut dose = parse_dose_row(row)?;
            dose.notes = self.load_notes(&uuid)?;
            return Ok(Some(dose));
        }
        Ok(None)
    }

    fn list_doses(&self) -> RepoResult<Vec<DoseEvent>> {
        let mut notes_by_dose: HashMap<DoseId, Vec<DoseNote>> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(&format!(
                "{NOTE_SELECT_SQL} ORDER BY noted_at ASC, uuid ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let (dose_id, note) = parse_note_row(row)?;
                notes_by_dose.entry(dose_id).or_default().push(note);
            }
        }

        let mut stmt = self.conn.prepare(&format!(
            "{DOSE_SELECT_SQL} ORDER BY taken_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut doses = Vec::new();
        while let Some(row) = rows.next()? {
            let mut dose = parse_dose_row(row)?;
            dose.notes = notes_by_dose.remove(&dose.id).unwrap_or_default();
            doses.push(dose);
        }
        Ok(doses)
    }

    fn update_phase_markers(&self, id: DoseId, markers: &PhaseMarkers) -> RepoResult<()> {
        let mut dose = self.get_dose(id)?.ok_or(RepoError::NotFound(id))?;
        dose.onset_at = markers.onset_at;
        dose.peak_at = markers.peak_at;
        dose.offset_at = markers.offset_at;
        dose.validate()?;

        let changed = self.conn.execute(
            "UPDATE doses
             SET
                onset_at = ?2,
                peak_at = ?3,
                offset_at = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                markers.onset_at.map(to_epoch_ms),
                markers.peak_at.map(to_epoch_ms),
                markers.offset_at.map(to_epoch_ms),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_dose(&self, id: DoseId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM doses WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn add_note(&self, dose_id: DoseId, note: &DoseNote) -> RepoResult<NoteId> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM doses WHERE uuid = ?1);",
            [dose_id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound(dose_id));
        }

        insert_note(self.conn, dose_id, note)?;
        Ok(note.id)
    }

    fn update_note(&self, note_id: NoteId, body: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE dose_notes SET body = ?2 WHERE uuid = ?1;",
            params![note_id.to_string(), body],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id));
        }
        Ok(())
    }

    fn delete_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM dose_notes WHERE uuid = ?1;", [note_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id));
        }
        Ok(())
    }
}

fn insert_note(conn: &Connection, dose_id: DoseId, note: &DoseNote) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO dose_notes (uuid, dose_uuid, body, noted_at)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            note.id.to_string(),
            dose_id.to_string(),
            note.body.as_str(),
            to_epoch_ms(note.noted_at),
        ],
    )?;
    Ok(())
}

fn parse_dose_row(row: &Row<'_>) -> RepoResult<DoseEvent> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "doses.uuid")?;

    let unit_text: String = row.get("unit")?;
    let unit = DoseUnit::parse(&unit_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid unit `{unit_text}` in doses.unit"))
    })?;

    let route_text: String = row.get("route")?;
    let route = Route::from_alias(&route_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid route `{route_text}` in doses.route"))
    })?;

    let dose = DoseEvent {
        id,
        substance: row.get("substance")?,
        amount: row.get("amount")?,
        unit,
        route,
        timestamp: from_epoch_ms(row.get("taken_at")?, "doses.taken_at")?,
        onset_at: optional_instant(row.get("onset_at")?, "doses.onset_at")?,
        peak_at: optional_instant(row.get("peak_at")?, "doses.peak_at")?,
        offset_at: optional_instant(row.get("offset_at")?, "doses.offset_at")?,
        notes: Vec::new(),
    };
    dose.validate()?;
    Ok(dose)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<(DoseId, DoseNote)> {
    let uuid_text: String = row.get("uuid")?;
    let dose_text: String = row.get("dose_uuid")?;
    let note = DoseNote {
        id: parse_uuid(&uuid_text, "dose_notes.uuid")?,
        body: row.get("body")?,
        noted_at: from_epoch_ms(row.get("noted_at")?, "dose_notes.noted_at")?,
    };
    Ok((parse_uuid(&dose_text, "dose_notes.dose_uuid")?, note))
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn to_epoch_ms(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn from_epoch_ms(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("out-of-range timestamp `{value}` in {column}"))
    })
}

fn optional_instant(value: Option<i64>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|ms| from_epoch_ms(ms, column)).transpose()
}
