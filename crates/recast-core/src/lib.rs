//! recast core - recipe composition and scheduling
//!
//! Runs a tree of recipes over a batch of source files:
//! - Composes recipes with ordered children and applicability tests
//! - Schedules them to a fixed point, per-source visits on the rayon pool
//! - Attributes every change to the recipe path that made it
//! - Reports generated, modified and deleted sources
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_core::prelude::*;
//!
//! let recipe = Recipe::<PlainText>::composite("org.example.Tidy")
//!     .add_child(trim_trailing_whitespace())
//!     .add_child(ensure_final_newline());
//!
//! let run = recipe.run(batch)?;
//! for result in run.results() {
//!     println!("{:?} changed by {:?}", result.after(), result.recipe_names());
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod context;
mod error;
mod ledger;
mod recipe;
mod result;
mod scheduler;

pub use config::SchedulerConfig;
pub use context::{CancellationToken, ErrorHandler, ExecutionContext};
pub use error::RecipeError;
pub use ledger::ProvenanceLedger;
pub use recipe::{KindVisitor, Recipe, RecipeBuilder, SourceVisitor};
pub use result::{RecipeResult, RecipeRun};
pub use scheduler::RecipeScheduler;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing and running recipes
    pub use crate::{
        CancellationToken, ExecutionContext, Recipe, RecipeError, RecipeResult, RecipeRun,
        RecipeScheduler, SchedulerConfig,
    };
    pub use recast_tree::{
        Accepts, Markers, SourceFile, SourcePath, Tree, TreeId, TreeVisitor, VisitError,
        VisitResult,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
