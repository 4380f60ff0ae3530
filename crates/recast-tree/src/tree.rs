//! Tree and source-file contracts
//!
//! Defines [`Tree`] for immutable nodes, [`SourceFile`] for the top-level
//! artifacts of a batch and [`Accepts`] for capability dispatch from a batch
//! element to one concrete tree kind.

use crate::marker::Markers;
use crate::path::SourcePath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use uuid::Uuid;

/// Stable identity of a tree node or source file
///
/// A rewrite that modifies a tree keeps its id. A newly generated tree gets
/// a fresh random id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TreeId(Uuid);

impl TreeId {
    /// Fresh random identity
    #[inline]
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing uuid
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying uuid
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable tree node
///
/// # Contract
/// - `id` is stable across rewrites of the same node
/// - `try_map_children` never mutates `self`; it returns a rebuilt node
/// - Equality is structural: two nodes are equal only if nothing observable differs
///
/// Leaf kinds keep the default `try_map_children`, which has no children to map.
pub trait Tree: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Node identity
    fn id(&self) -> TreeId;

    /// Rebuild this node with each direct child passed through `f`
    ///
    /// A child for which `f` returns `Ok(None)` is removed. The first error
    /// aborts the rebuild and is returned unchanged.
    ///
    /// # Errors
    /// Returns whatever error `f` produced.
    fn try_map_children<E, F>(self, f: F) -> Result<Self, E>
    where
        F: FnMut(Self) -> Result<Option<Self>, E>,
    {
        let _ = f;
        Ok(self)
    }
}

/// Top-level artifact of a batch
///
/// Opaque to the scheduler apart from identity, location and markers.
pub trait SourceFile: Tree {
    /// Logical location of this source
    fn source_path(&self) -> &SourcePath;

    /// Attached metadata
    fn markers(&self) -> &Markers;

    /// Copy of this source with `markers` replacing the current set
    #[must_use]
    fn with_markers(self, markers: Markers) -> Self;
}

/// Capability dispatch from a batch element to the tree kind `T`
///
/// A batch may mix kinds; a closed enum of kinds implements `Accepts<K>` once
/// per kind it carries. Visitors over `T` only run against sources for which
/// [`Accepts::kind`] returns `Some`, everything else passes through untouched.
pub trait Accepts<T: Tree>: SourceFile {
    /// Borrow the `T` this source carries, if it is of that kind
    fn kind(&self) -> Option<&T>;

    /// Whether visitors over `T` understand this source
    #[inline]
    fn accepts_visitor(&self) -> bool {
        <Self as Accepts<T>>::kind(self).is_some()
    }

    /// Rewrite the `T` inside this source
    ///
    /// Sources of another kind are returned as `Ok(Some(self))` without
    /// calling `f`. When `f` returns `Ok(None)` the whole source is deleted.
    ///
    /// # Errors
    /// Returns whatever error `f` produced.
    fn try_map_kind<E, F>(self, f: F) -> Result<Option<Self>, E>
    where
        F: FnOnce(T) -> Result<Option<T>, E>;
}

impl<S: SourceFile> Accepts<S> for S {
    #[inline]
    fn kind(&self) -> Option<&S> {
        Some(self)
    }

    #[inline]
    fn try_map_kind<E, F>(self, f: F) -> Result<Option<Self>, E>
    where
        F: FnOnce(S) -> Result<Option<S>, E>,
    {
        f(self)
    }
}
