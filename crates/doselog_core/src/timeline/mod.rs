//! Timeline engine: phases, intensity curves and shared-axis composition.
//!
//! # Responsibility
//! - Normalize durations, classify phases and synthesize intensity curves.
//! - Project curves onto a blended log/linear display axis.
//! - Compose concurrently active doses onto one shared timeline.
//!
//! # Invariants
//! - Pure and synchronous: no I/O, no ambient clock, no shared state.
//!   `now` is always an explicit argument.
//! - Absence of reference data is signalled with `None`/empty results.

pub mod axis;
pub mod compositor;
pub mod duration;
pub mod intensity;
pub mod phase;
pub mod scale;
