//! Reference data for duration curves.
//!
//! # Responsibility
//! - Hold the read-only library of per-substance, per-route curves.
//! - Resolve queries with alias matching and a deterministic route fallback.
//!
//! # Invariants
//! - Both physical record shapes are normalized here; callers only ever see
//!   a canonical `DurationCurve`.

pub mod library;
pub mod substance_name;
