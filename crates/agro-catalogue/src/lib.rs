#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Government scheme catalogue.
//!
//! [`SchemeCatalogue`] holds the per-state scheme lists and resolves unknown
//! states to the catalogue's default state.

use agro_core::{AgroError, Result, Scheme};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// The catalogue shipped with the crate.
const EMBEDDED_CATALOGUE: &str = include_str!("../data/schemes.json");

/// Immutable, validated scheme reference data keyed by state.
#[derive(Debug, Clone)]
pub struct SchemeCatalogue {
    default_state: String,
    /// States in file order; names are lowercase.
    states: Vec<(String, Vec<Scheme>)>,
}

impl SchemeCatalogue {
    /// Loads the catalogue embedded in the crate.
    ///
    /// # Errors
    /// Returns [`AgroError::Catalogue`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CATALOGUE)
    }

    /// Loads a catalogue file from disk.
    ///
    /// # Errors
    /// Returns [`AgroError::Catalogue`] if the file cannot be read or is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgroError::Catalogue(format!("{}: {e}", path.display())))?;
        let catalogue = Self::from_json(&text)?;
        info!(path = %path.display(), states = catalogue.states.len(), "Loaded scheme catalogue");
        Ok(catalogue)
    }

    /// Parses and validates a catalogue document.
    ///
    /// # Errors
    /// Returns [`AgroError::Catalogue`] if the document is not valid JSON of the
    /// expected shape, a state appears twice, a scheme id repeats within a
    /// state, or the default state has no entry.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogueFile =
            serde_json::from_str(text).map_err(|e| AgroError::Catalogue(e.to_string()))?;

        let default_state = file.default_state.trim().to_lowercase();
        let mut states: Vec<(String, Vec<Scheme>)> = Vec::with_capacity(file.states.len());

        for entry in file.states {
            let state = entry.state.trim().to_lowercase();
            if state.is_empty() {
                return Err(AgroError::Catalogue("state name must not be empty".into()));
            }
            if states.iter().any(|(s, _)| *s == state) {
                return Err(AgroError::Catalogue(format!("state {state} listed twice")));
            }

            let mut ids = HashSet::new();
            for scheme in &entry.schemes {
                if !ids.insert(scheme.id.as_str()) {
                    return Err(AgroError::Catalogue(format!(
                        "duplicate scheme id {} in {state}",
                        scheme.id
                    )));
                }
            }

            states.push((state, entry.schemes));
        }

        if !states.iter().any(|(s, _)| *s == default_state) {
            return Err(AgroError::Catalogue(format!(
                "default state {default_state} has no schemes entry"
            )));
        }

        Ok(Self {
            default_state,
            states,
        })
    }

    /// The state used when a requested state has no entry.
    #[must_use]
    pub fn default_state(&self) -> &str {
        &self.default_state
    }

    /// Names of every state in the catalogue, in file order.
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|(s, _)| s.as_str())
    }

    /// The state whose schemes answer a request for `state`.
    #[must_use]
    pub fn resolve_state(&self, state: &str) -> &str {
        let wanted = state.trim().to_lowercase();
        match self.states.iter().find(|(s, _)| *s == wanted) {
            Some((s, _)) => s,
            None => {
                debug!(state = %wanted, default = %self.default_state, "Unknown state, using default");
                &self.default_state
            }
        }
    }

    /// Schemes for `state`, or for the default state when `state` has no entry.
    #[must_use]
    pub fn schemes_for(&self, state: &str) -> &[Scheme] {
        let resolved = self.resolve_state(state);
        self.states
            .iter()
            .find(|(s, _)| s == resolved)
            .map(|(_, schemes)| schemes.as_slice())
            .unwrap_or_default()
    }

    /// Looks up a scheme by id within the resolved state.
    #[must_use]
    pub fn find(&self, id: &str, state: &str) -> Option<&Scheme> {
        self.schemes_for(state).iter().find(|s| s.id == id)
    }

    /// Distinct categories across every state, in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.states
            .iter()
            .flat_map(|(_, schemes)| schemes)
            .filter(|s| seen.insert(s.category.as_str()))
            .map(|s| s.category.clone())
            .collect()
    }
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    default_state: String,
    states: Vec<StateEntry>,
}

#[derive(Debug, Deserialize)]
struct StateEntry {
    state: String,
    #[serde(default)]
    schemes: Vec<Scheme>,
}
