//! Repository layer over the journal database.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from services and the timeline engine.
//!
//! # Invariants
//! - Repository writes enforce `DoseEvent::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod dose_repo;
