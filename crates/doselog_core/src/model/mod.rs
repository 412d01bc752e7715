//! Domain model for dose journaling and reference curves.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Normalize units, routes and curve shapes at the model boundary.
//!
//! # Invariants
//! - Every dose is identified by a stable `DoseId`.
//! - Reference curves reach the timeline engine in one canonical shape.

pub mod curve;
pub mod dose;
pub mod route;
