//! Metadata attached to sources
//!
//! [`Markers`] is a persistent, cheaply cloned set of [`Marker`]s. Adding a
//! marker returns a new set and leaves the original untouched.

use crate::provenance::Provenance;
use im::Vector;
use serde::{Deserialize, Serialize};

/// A single piece of source metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Marker {
    /// A search recipe found something here
    SearchResult {
        /// Optional explanation of the match
        description: Option<String>,
    },

    /// Recipes that changed this source during the last run
    RecipesThatMadeChanges(Provenance),

    /// Collaborator-defined metadata
    Custom {
        /// Key, unique within one marker set
        key: String,
        /// Arbitrary JSON payload
        value: serde_json::Value,
    },
}

/// Persistent marker set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Markers {
    entries: Vector<Marker>,
}

impl Markers {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Iterate markers in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.entries.iter()
    }

    /// Number of markers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this set with `marker` appended
    #[must_use]
    pub fn with(&self, marker: Marker) -> Self {
        let mut entries = self.entries.clone();
        entries.push_back(marker);
        Self { entries }
    }

    /// Change provenance, if the source was changed by a run
    #[must_use]
    pub fn provenance(&self) -> Option<&Provenance> {
        self.entries.iter().find_map(|m| match m {
            Marker::RecipesThatMadeChanges(p) => Some(p),
            _ => None,
        })
    }

    /// Copy of this set whose provenance is `provenance`
    ///
    /// Any provenance from an earlier run is replaced.
    #[must_use]
    pub fn with_provenance(&self, provenance: Provenance) -> Self {
        self.without_provenance()
            .with(Marker::RecipesThatMadeChanges(provenance))
    }

    /// Copy of this set without provenance
    #[must_use]
    pub fn without_provenance(&self) -> Self {
        self.retain(|m| !matches!(m, Marker::RecipesThatMadeChanges(_)))
    }

    /// Copy of this set with a search result appended
    #[must_use]
    pub fn with_search_result(&self, description: Option<String>) -> Self {
        self.with(Marker::SearchResult { description })
    }

    /// Descriptions of every search result, `None` for undescribed matches
    pub fn search_results(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().filter_map(|m| match m {
            Marker::SearchResult { description } => Some(description.as_deref()),
            _ => None,
        })
    }

    /// Payload of the custom marker stored under `key`
    #[must_use]
    pub fn custom(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.iter().find_map(|m| match m {
            Marker::Custom { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// Copy of this set with `value` stored under `key`, replacing any previous value
    #[must_use]
    pub fn with_custom(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        self.retain(|m| !matches!(m, Marker::Custom { key: k, .. } if *k == key))
            .with(Marker::Custom { key, value })
    }

    fn retain(&self, keep: impl Fn(&Marker) -> bool) -> Self {
        Self {
            entries: self.entries.iter().filter(|m| keep(m)).cloned().collect(),
        }
    }
}

impl FromIterator<Marker> for Markers {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
