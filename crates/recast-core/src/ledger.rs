//! Per-source change provenance
//!
//! The scheduler records one recipe path per observed change. Lookup is a
//! single hash probe per source; descriptor trees are only assembled when a
//! result is built.

use indexmap::IndexSet;
use recast_tree::{Provenance, RecipeDescriptor, RecipeFrame, TreeId};
use std::collections::HashMap;

/// Recipe paths that changed each source of a run
#[derive(Debug, Clone, Default)]
pub struct ProvenanceLedger {
    changes: HashMap<TreeId, Provenance>,
}

impl ProvenanceLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute a change of `id` to the last recipe of `path`
    ///
    /// Returns `true` if this path had not changed `id` before.
    pub fn record_change(&mut self, id: TreeId, path: &[RecipeFrame]) -> bool {
        let recorded = self.changes.entry(id).or_default().record(path);
        if recorded {
            tracing::trace!(
                source = %id,
                recipe = path.last().map_or("", RecipeFrame::name),
                depth = path.len(),
                "change recorded"
            );
        }
        recorded
    }

    /// Provenance of `id`, if anything changed it
    #[inline]
    #[must_use]
    pub fn get(&self, id: &TreeId) -> Option<&Provenance> {
        self.changes.get(id)
    }

    /// Composition-ordered tree of the recipes that changed `id`
    #[must_use]
    pub fn descriptor_tree(&self, id: &TreeId) -> Vec<RecipeDescriptor> {
        self.get(id).map(Provenance::descriptors).unwrap_or_default()
    }

    /// Distinct names of the recipes that changed `id`
    #[must_use]
    pub fn flatten_names(&self, id: &TreeId) -> IndexSet<String> {
        self.get(id).map(Provenance::recipe_names).unwrap_or_default()
    }

    /// Check if `id` was changed by any recipe
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &TreeId) -> bool {
        self.changes.contains_key(id)
    }

    /// Number of changed sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
