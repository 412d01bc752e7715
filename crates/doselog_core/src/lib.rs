//! Core domain logic for the dose journal.
//! Parsing, persistence and the timeline engine live here; front ends only
//! call into this crate.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod parse;
pub mod reference;
pub mod repo;
pub mod service;
pub mod timeline;

pub use config::{ConfigError, TimelineConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::curve::{DurationCurve, GRACE_PERIOD_MULTIPLIER};
pub use model::dose::{DoseEvent, DoseId, DoseNote, DoseUnit, DoseValidationError, InputUnit};
pub use model::route::Route;
pub use parse::dose_string::{parse_dose_string, DoseParseError, ParsedDose};
pub use reference::library::{CurveLookup, ReferenceLibrary, ReferenceLoadError};
pub use repo::dose_repo::{DoseRepository, RepoError, RepoResult, SqliteDoseRepository};
pub use service::dose_service::{DoseService, DoseServiceError, MarkerKind};
pub use service::dose_stats::{DoseFilter, DoseSummary};
pub use timeline::compositor::{compose_active, ActiveExperience, SharedTimeline, SingleTimeline};
pub use timeline::phase::Phase;

/// Health-check probe used by the CLI.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
