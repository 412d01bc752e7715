use chrono::{DateTime, Duration, TimeZone, Utc};
use doselog_core::db::open_db_in_memory;
use doselog_core::model::dose::DoseNote;
use doselog_core::repo::dose_repo::PhaseMarkers;
use doselog_core::{
    DoseEvent, DoseRepository, DoseUnit, DoseValidationError, InputUnit, RepoError, Route,
    SqliteDoseRepository,
};
use uuid::Uuid;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 20, hour, 0, 0).unwrap()
}

fn note(body: &str, noted_at: DateTime<Utc>) -> DoseNote {
    DoseNote {
        id: Uuid::new_v4(),
        body: body.to_string(),
        noted_at,
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);

    let dose = DoseEvent::new("Kratom", 2.0, InputUnit::G, Route::Oral, at(21));
    let id = repo.create_dose(&dose).unwrap();

    let loaded = repo.get_dose(id).unwrap().unwrap();
    assert_eq!(loaded, dose);
    assert_eq!(loaded.substance, "kratom");
    assert_eq!(loaded.amount, 2000.0);
    assert_eq!(loaded.unit, DoseUnit::Mg);
}

#[test]
fn get_missing_dose_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    assert!(repo.get_dose(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn create_rejects_invalid_dose() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);

    let mut dose = DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(8));
    dose.substance = "   ".to_string();

    match repo.create_dose(&dose).unwrap_err() {
        RepoError::Validation(DoseValidationError::EmptySubstance) => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn list_orders_by_taken_at_and_attaches_notes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);

    let late = DoseEvent::new("caffeine", 50.0, InputUnit::Mg, Route::Oral, at(14));
    let early = DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(8));
    repo.create_dose(&late).unwrap();
    repo.create_dose(&early).unwrap();

    repo.add_note(early.id, &note("second", at(10))).unwrap();
    repo.add_note(early.id, &note("first", at(9))).unwrap();

    let doses = repo.list_doses().unwrap();
    assert_eq!(doses.len(), 2);
    assert_eq!(doses[0].id, early.id);
    assert_eq!(doses[1].id, late.id);

    let bodies: Vec<&str> = doses[0].notes.iter().map(|n| n.body.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second"]);
    assert!(doses[1].notes.is_empty());
}

#[test]
fn phase_markers_update_and_validate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    let dose = DoseEvent::new("lsd", 100.0, InputUnit::Ug, Route::Sublingual, at(12));
    repo.create_dose(&dose).unwrap();

    let markers = PhaseMarkers {
        onset_at: Some(at(13)),
        peak_at: Some(at(15)),
        offset_at: None,
    };
    repo.update_phase_markers(dose.id, &markers).unwrap();
    let loaded = repo.get_dose(dose.id).unwrap().unwrap();
    assert_eq!(PhaseMarkers::of(&loaded), markers);

    let orphan_offset = PhaseMarkers {
        offset_at: Some(at(20)),
        ..PhaseMarkers::default()
    };
    assert!(matches!(
        repo.update_phase_markers(dose.id, &orphan_offset),
        Err(RepoError::Validation(DoseValidationError::OffsetWithoutPeak))
    ));
    assert!(matches!(
        repo.update_phase_markers(Uuid::new_v4(), &markers),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn timestamps_keep_millisecond_precision() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    let taken_at = at(9) + Duration::milliseconds(1_234);
    let dose = DoseEvent::new("caffeine", 80.0, InputUnit::Mg, Route::Oral, taken_at);
    repo.create_dose(&dose).unwrap();

    let loaded = repo.get_dose(dose.id).unwrap().unwrap();
    assert_eq!(loaded.timestamp, taken_at);
}

#[test]
fn delete_dose_cascades_to_notes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    let dose = DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(8));
    repo.create_dose(&dose).unwrap();
    let first = note("jittery", at(9));
    repo.add_note(dose.id, &first).unwrap();

    repo.delete_dose(dose.id).unwrap();
    assert!(repo.get_dose(dose.id).unwrap().is_none());

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM dose_notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(matches!(
        repo.delete_dose(dose.id),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn note_update_and_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    let dose = DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(8));
    repo.create_dose(&dose).unwrap();
    let draft = note("draft", at(9));
    repo.add_note(dose.id, &draft).unwrap();

    repo.update_note(draft.id, "edited").unwrap();
    let loaded = repo.get_dose(dose.id).unwrap().unwrap();
    assert_eq!(loaded.notes[0].body, "edited");

    repo.delete_note(draft.id).unwrap();
    assert!(repo.get_dose(dose.id).unwrap().unwrap().notes.is_empty());
    assert!(matches!(
        repo.delete_note(draft.id),
        Err(RepoError::NoteNotFound(_))
    ));
    assert!(matches!(
        repo.add_note(Uuid::new_v4(), &note("orphan", at(9))),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn failed_note_insert_rolls_back_the_dose() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDoseRepository::new(&conn);
    let mut dose = DoseEvent::new("caffeine", 100.0, InputUnit::Mg, Route::Oral, at(8));
    let first = note("first", at(9));
    let clash = DoseNote {
        body: "same id".to_string(),
        ..first.clone()
    };
    dose.notes = vec![first, clash];

    assert!(matches!(repo.create_dose(&dose), Err(RepoError::Db(_))));
    assert!(repo.get_dose(dose.id).unwrap().is_none());

    let stored_notes: i64 = conn
        .query_row("SELECT COUNT(*) FROM dose_notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored_notes, 0);

    dose.notes.truncate(1);
    repo.create_dose(&dose).unwrap();
    assert_eq!(repo.get_dose(dose.id).unwrap().unwrap().notes.len(), 1);
}
