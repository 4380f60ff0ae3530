//! Error types for recast-core
//!
//! Provides error handling for:
//! - Per-source visit failures (routed through the context's error hook)
//! - Batch transform and applicability-test failures
//! - Source contract violations (always fatal)
//! - Invalid recipes and configuration

use recast_tree::{SourcePath, VisitError};

/// Main recipe error type
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// A recipe's visitor failed on one source
    #[error("recipe '{recipe}' failed on '{source_path}': {cause}")]
    VisitFailed {
        /// Recipe name
        recipe: String,
        /// Location of the source being visited
        source_path: SourcePath,
        /// Underlying failure
        #[source]
        cause: VisitError,
    },

    /// A recipe's bulk transform failed
    #[error("batch transform of recipe '{recipe}' failed: {cause}")]
    TransformFailed {
        /// Recipe name
        recipe: String,
        /// Underlying failure
        #[source]
        cause: VisitError,
    },

    /// An applicability test failed on one source
    #[error("applicability test of recipe '{recipe}' failed on '{source_path}': {cause}")]
    ApplicabilityFailed {
        /// Recipe name
        recipe: String,
        /// Location of the source being tested
        source_path: SourcePath,
        /// Underlying failure
        #[source]
        cause: VisitError,
    },

    /// A recipe broke the source contract (programming error in the recipe)
    #[error("recipe '{recipe}' broke the source contract: {detail}")]
    ContractViolation {
        /// Recipe name
        recipe: String,
        /// What was broken
        detail: String,
    },

    /// Recipe tree is malformed
    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    /// An error hook escalated a failure
    #[error("run aborted: {0}")]
    Aborted(String),

    /// Scheduler configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl RecipeError {
    /// Check if this error always ends the run
    ///
    /// Non-fatal errors are isolated to one (source, recipe) pair and go
    /// through the context's error hook first.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation { .. } | Self::InvalidRecipe(_) | Self::Aborted(_) | Self::Config(_)
        )
    }

    /// Name of the recipe involved, if any
    #[must_use]
    pub fn recipe(&self) -> Option<&str> {
        match self {
            Self::VisitFailed { recipe, .. }
            | Self::TransformFailed { recipe, .. }
            | Self::ApplicabilityFailed { recipe, .. }
            | Self::ContractViolation { recipe, .. } => Some(recipe),
            Self::InvalidRecipe(_) | Self::Aborted(_) | Self::Config(_) => None,
        }
    }

    /// Create contract violation error
    #[inline]
    #[must_use]
    pub fn contract_violation(recipe: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ContractViolation {
            recipe: recipe.into(),
            detail: detail.into(),
        }
    }

    /// Create abort error
    #[inline]
    #[must_use]
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }
}
