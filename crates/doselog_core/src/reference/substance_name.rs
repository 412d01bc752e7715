//! Substance names with parenthetical aliases.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([^(]*?)\s*\(([^)]*)\)\s*$").expect("valid alias regex"));

/// Precomputed lookup keys for one reference entry.
///
/// `"MDMA (Ecstasy, Molly)"` becomes main name `mdma` with aliases
/// `ecstasy` and `molly`. All keys are trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstanceName {
    pub display: String,
    pub main: String,
    pub aliases: Vec<String>,
}

impl SubstanceName {
    pub fn parse(raw: &str) -> Self {
        let display = raw.trim().to_string();
        match PARENTHETICAL_RE.captures(&display) {
            Some(caps) => {
                let main = caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_lowercase())
                    .unwrap_or_default();
                let aliases = caps
                    .get(2)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(|alias| alias.trim().to_lowercase())
                            .filter(|alias| !alias.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                Self {
                    main,
                    aliases,
                    display,
                }
            }
            None => Self {
                main: display.to_lowercase(),
                aliases: Vec::new(),
                display,
            },
        }
    }

    /// Whether an already-normalized query names this substance.
    pub fn matches(&self, normalized_query: &str) -> bool {
        !normalized_query.is_empty()
            && (self.main == normalized_query
                || self.aliases.iter().any(|alias| alias == normalized_query))
    }
}

#[cfg(test)]
mod tests {
    use super::SubstanceName;

    #[test]
    fn parses_main_name_and_aliases() {
        let name = SubstanceName::parse("MDMA (Ecstasy, Molly)");
        assert_eq!(name.main, "mdma");
        assert_eq!(name.aliases, vec!["ecstasy".to_string(), "molly".to_string()]);
        assert_eq!(name.display, "MDMA (Ecstasy, Molly)");
    }

    #[test]
    fn plain_name_has_no_aliases() {
        let name = SubstanceName::parse("  Caffeine ");
        assert_eq!(name.main, "caffeine");
        assert!(name.aliases.is_empty());
        assert!(name.matches("caffeine"));
        assert!(!name.matches(""));
    }

    #[test]
    fn multi_word_main_names_survive() {
        let name = SubstanceName::parse("Psilocybin mushrooms (Shrooms)");
        assert_eq!(name.main, "psilocybin mushrooms");
        assert!(name.matches("shrooms"));
    }
}
