//! Run output
//!
//! A [`RecipeRun`] holds the final batch and one [`RecipeResult`] per source
//! that was generated, modified or deleted. Untouched sources are not
//! reported.

use indexmap::IndexSet;
use recast_tree::{RecipeDescriptor, SourceFile};

/// One changed source of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeResult<S> {
    before: Option<S>,
    after: Option<S>,
    descriptors: Vec<RecipeDescriptor>,
    names: IndexSet<String>,
}

impl<S: SourceFile> RecipeResult<S> {
    pub(crate) fn new(
        before: Option<S>,
        after: Option<S>,
        descriptors: Vec<RecipeDescriptor>,
        names: IndexSet<String>,
    ) -> Self {
        Self {
            before,
            after,
            descriptors,
            names,
        }
    }

    /// Source as given to the run; absent if generated
    #[inline]
    #[must_use]
    pub fn before(&self) -> Option<&S> {
        self.before.as_ref()
    }

    /// Source after the run; absent if deleted
    #[inline]
    #[must_use]
    pub fn after(&self) -> Option<&S> {
        self.after.as_ref()
    }

    /// Recipes that changed this source, in composition shape
    #[inline]
    #[must_use]
    pub fn recipe_descriptors(&self) -> &[RecipeDescriptor] {
        &self.descriptors
    }

    /// Distinct names of the recipes that changed this source
    #[inline]
    #[must_use]
    pub fn recipe_names(&self) -> &IndexSet<String> {
        &self.names
    }

    /// Check if a recipe created this source
    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.before.is_none()
    }

    /// Check if a recipe removed this source
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.after.is_none()
    }

    /// Check if the source survived with a different structure
    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }
}

/// Output of one top-level run
#[derive(Debug, Clone)]
pub struct RecipeRun<S> {
    results: Vec<RecipeResult<S>>,
    batch: Vec<S>,
    cycles: usize,
}

impl<S: SourceFile> RecipeRun<S> {
    pub(crate) fn new(results: Vec<RecipeResult<S>>, batch: Vec<S>, cycles: usize) -> Self {
        Self {
            results,
            batch,
            cycles,
        }
    }

    /// Changed sources
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[RecipeResult<S>] {
        &self.results
    }

    /// Final batch, changed sources stamped with their provenance
    #[inline]
    #[must_use]
    pub fn batch(&self) -> &[S] {
        &self.batch
    }

    /// Take the final batch
    #[inline]
    #[must_use]
    pub fn into_batch(self) -> Vec<S> {
        self.batch
    }

    /// Passes made over the batch
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Number of reported sources
    #[inline]
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.results.len()
    }

    /// Check if nothing changed
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.results.is_empty()
    }
}
