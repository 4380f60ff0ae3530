//! recast Tree Model
//!
//! Immutable source trees, attached markers and the visitor traversal engine.
//!
//! # Core Concepts
//!
//! - [`Tree`]: Immutable node with a stable [`TreeId`] and rebuildable children
//! - [`SourceFile`]: Top-level artifact of a batch (location + markers)
//! - [`Accepts`]: Capability dispatch from a batch element to one concrete tree kind
//! - [`TreeVisitor`]: Pre/post-visit traversal returning a new tree or nothing
//! - [`Markers`]: Metadata attached to a source, including change [`Provenance`]
//! - [`SourcePath`]: Logical location of a source inside the batch
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_tree::{TreeVisitor, VisitResult};
//!
//! struct Shout;
//!
//! impl TreeVisitor<PlainText, ()> for Shout {
//!     fn visit_node(&mut self, text: PlainText, _p: &()) -> VisitResult<PlainText> {
//!         let upper = text.text.to_uppercase();
//!         Ok(Some(text.with_text(upper)))
//!     }
//! }
//!
//! let after = Shout.visit(before, &())?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod marker;
mod path;
mod provenance;
mod tree;
mod visitor;

// Re-exports
pub use marker::{Marker, Markers};
pub use path::{PathError, SourcePath};
pub use provenance::{Provenance, RecipeDescriptor, RecipeFrame};
pub use tree::{Accepts, SourceFile, Tree, TreeId};
pub use visitor::{visit_root, TreeVisitor, VisitError, VisitResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::str::FromStr;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: TreeId,
        path: SourcePath,
        markers: Markers,
        body: String,
    }

    impl Tree for Note {
        fn id(&self) -> TreeId {
            self.id
        }
    }

    impl SourceFile for Note {
        fn source_path(&self) -> &SourcePath {
            &self.path
        }

        fn markers(&self) -> &Markers {
            &self.markers
        }

        fn with_markers(self, markers: Markers) -> Self {
            Self { markers, ..self }
        }
    }

    struct Trim;

    impl TreeVisitor<Note, ()> for Trim {
        fn visit_node(&mut self, note: Note, _p: &()) -> VisitResult<Note> {
            let body = note.body.trim().to_string();
            Ok(Some(Note { body, ..note }))
        }
    }

    #[test]
    fn source_lifecycle_keeps_identity_through_rewrite() {
        let before = Note {
            id: TreeId::random(),
            path: SourcePath::from_str("notes/a.txt").unwrap(),
            markers: Markers::empty(),
            body: "  hello  ".to_string(),
        };

        let after = visit_root(&mut Trim, before.clone(), &()).unwrap().unwrap();

        assert_eq!(after.id(), before.id());
        assert_eq!(after.body, "hello");
        assert_ne!(after, before);
        // Input is never mutated
        assert_eq!(before.body, "  hello  ");
    }

    #[test]
    fn provenance_is_queryable_from_markers_alone() {
        let mut provenance = Provenance::default();
        provenance.record(&[RecipeFrame::new(0, "root", "Root"), RecipeFrame::new(0, "fix", "Fix")]);

        let markers = Markers::empty().with_provenance(provenance);
        let names: Vec<_> = markers
            .provenance()
            .map(|p| p.recipe_names().into_iter().collect())
            .unwrap_or_default();

        assert_eq!(names, vec!["fix".to_string()]);
    }
}
