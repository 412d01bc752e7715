//! Administration route model and alias table.
//!
//! # Responsibility
//! - Define the canonical set of administration routes.
//! - Map free-text route words and `@verb` shorthands onto that set.
//!
//! # Invariants
//! - Alias lookup is trim + lowercase insensitive.
//! - Every canonical route name resolves to itself.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Canonical administration route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Oral,
    Insufflation,
    Inhalation,
    Intravenous,
    Intramuscular,
    Subcutaneous,
    Rectal,
    Transdermal,
    Sublingual,
    Buccal,
    Other,
}

const ROUTE_ALIASES: &[(Route, &[&str])] = &[
    (Route::Oral, &["oral", "swallowed", "chewed", "@ate"]),
    (
        Route::Insufflation,
        &["insufflation", "snorted", "intranasal", "nasal", "@sniffed"],
    ),
    (
        Route::Inhalation,
        &["inhalation", "inhaled", "smoked", "vaporized"],
    ),
    (
        Route::Intravenous,
        &[
            "intravenous",
            "intravenous-injection",
            "intra-arterial",
            "injected",
            "@injected",
        ],
    ),
    (
        Route::Intramuscular,
        &["intramuscular", "intramuscular-injection"],
    ),
    (
        Route::Subcutaneous,
        &["subcutaneous", "subcutaneous-injection", "intradermal"],
    ),
    (
        Route::Rectal,
        &["rectal", "intrarectal", "plugged", "@boofed"],
    ),
    (
        Route::Transdermal,
        &["transdermal", "dermal", "applied", "topical"],
    ),
    (Route::Sublingual, &["sublingual", "dissolved"]),
    (Route::Buccal, &["buccal"]),
    (
        Route::Other,
        &[
            "other",
            "intravaginal",
            "intrathecal",
            "intraperitoneal",
            "intraosseous",
            "intravitreal",
            "intrapleural",
            "intrapericardial",
            "intravesical",
            "intralesional",
            "ocular",
            "otic",
            "epidural",
            "absorbed",
            "administered",
        ],
    ),
];

impl Route {
    /// Resolves a route word or `@verb` shorthand to its canonical route.
    pub fn from_alias(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase();
        ROUTE_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
            .map(|(route, _)| *route)
    }

    /// Same as [`Route::from_alias`], but unknown words map to `Other`.
    pub fn from_alias_or_other(value: &str) -> Self {
        Self::from_alias(value).unwrap_or(Self::Other)
    }

    /// Stable lowercase name used for storage and reference matching.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oral => "oral",
            Self::Insufflation => "insufflation",
            Self::Inhalation => "inhalation",
            Self::Intravenous => "intravenous",
            Self::Intramuscular => "intramuscular",
            Self::Subcutaneous => "subcutaneous",
            Self::Rectal => "rectal",
            Self::Transdermal => "transdermal",
            Self::Sublingual => "sublingual",
            Self::Buccal => "buccal",
            Self::Other => "other",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a route word for comparisons.
///
/// Known aliases collapse onto the canonical name; anything else is only
/// trimmed and lowercased so reference data with exotic route tags still
/// matches itself.
pub fn normalize_route_key(value: &str) -> String {
    match Route::from_alias(value) {
        Some(route) => route.as_str().to_string(),
        None => value.trim().to_lowercase(),
    }
}
