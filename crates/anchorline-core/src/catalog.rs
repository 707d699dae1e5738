use std::collections::BTreeMap;

use crate::config::read_non_empty_env;
use crate::error::{AnchorlineError, Result};

pub const LOCATIONS_ENV: &str = "ANCHORLINE_LOCATIONS";

/// Known check-in locations. Events referencing an id outside this set
/// are rejected before the engine runs, with the valid ids echoed back.
#[derive(Debug, Clone)]
pub struct LocationCatalog {
    entries: BTreeMap<String, String>,
}

impl Default for LocationCatalog {
    fn default() -> Self {
        Self::new([
            ("gym-main", "Main Street Gym"),
            ("office-hq", "Headquarters"),
            ("studio-loft", "Loft Studio"),
        ])
    }
}

impl LocationCatalog {
    #[must_use]
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }

    /// Catalog from `ANCHORLINE_LOCATIONS`, a comma list of `id=Display Name`
    /// pairs (bare ids reuse the id as the name). Falls back to the seeded
    /// default set when unset.
    #[must_use]
    pub fn from_env() -> Self {
        let Some(raw) = read_non_empty_env(LOCATIONS_ENV) else {
            return Self::default();
        };
        let entries: BTreeMap<String, String> = raw
            .split(',')
            .filter_map(|chunk| {
                let chunk = chunk.trim();
                if chunk.is_empty() {
                    return None;
                }
                match chunk.split_once('=') {
                    Some((id, name)) => Some((id.trim().to_string(), name.trim().to_string())),
                    None => Some((chunk.to_string(), chunk.to_string())),
                }
            })
            .collect();
        if entries.is_empty() {
            return Self::default();
        }
        Self { entries }
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn resolve(&self, location_id: &str) -> Result<&str> {
        self.entries
            .get(location_id)
            .map(String::as_str)
            .ok_or_else(|| AnchorlineError::UnknownLocation {
                given: location_id.to_string(),
                known: self.ids(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_display_name() {
        let catalog = LocationCatalog::default();
        assert_eq!(catalog.resolve("gym-main").expect("known"), "Main Street Gym");
    }

    #[test]
    fn unknown_location_lists_valid_ids() {
        let catalog = LocationCatalog::default();
        let err = catalog.resolve("moon-base").expect_err("must fail");
        match err {
            AnchorlineError::UnknownLocation { given, known } => {
                assert_eq!(given, "moon-base");
                assert_eq!(known, vec!["gym-main", "office-hq", "studio-loft"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn custom_catalog_overrides_defaults() {
        let catalog = LocationCatalog::new([("lab-7", "Lab Seven")]);
        assert!(catalog.resolve("gym-main").is_err());
        assert_eq!(catalog.resolve("lab-7").expect("known"), "Lab Seven");
    }
}
