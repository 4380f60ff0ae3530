//! Change provenance
//!
//! Records which recipes, at which points of a recipe composition, changed a
//! source. A change is recorded as the stack of [`RecipeFrame`]s from the
//! run's root recipe down to the recipe that made it. [`Provenance`] merges
//! those stacks back into a composition-ordered [`RecipeDescriptor`] tree.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// One recipe at one composition point
///
/// `position` is the index among its siblings (0 for the root), so the same
/// recipe name appearing under different parents, or twice under the same
/// parent, yields distinct frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeFrame {
    position: usize,
    name: String,
    display_name: String,
}

impl RecipeFrame {
    /// Create new frame
    #[inline]
    #[must_use]
    pub fn new(position: usize, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            display_name: display_name.into(),
        }
    }

    /// Index among siblings
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Recipe name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human label
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    fn same_slot(&self, other: &Self) -> bool {
        self.position == other.position && self.name == other.name
    }
}

/// Recipe node of a provenance or composition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDescriptor {
    /// Stable recipe name
    pub name: String,
    /// Human label
    pub display_name: String,
    /// Child descriptors in composition order
    pub children: Vec<RecipeDescriptor>,
}

impl RecipeDescriptor {
    /// Descriptor without children
    #[inline]
    #[must_use]
    pub fn leaf(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            children: Vec::new(),
        }
    }

    /// First direct child with the given name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&RecipeDescriptor> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Names of this node and all descendants, pre-order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.name);
        for child in &self.children {
            child.collect_names(out);
        }
    }
}

/// Recipe paths that changed one source
///
/// Identical paths are stored once, so the same composition point changing
/// a source in several cycles is never double counted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provenance {
    paths: Vec<Vec<RecipeFrame>>,
}

impl Provenance {
    /// Record a change made by the last frame of `path`
    ///
    /// Returns `true` if the path was not already recorded. Empty paths are
    /// ignored.
    pub fn record(&mut self, path: &[RecipeFrame]) -> bool {
        if path.is_empty() || self.paths.iter().any(|p| p.as_slice() == path) {
            return false;
        }
        self.paths.push(path.to_vec());
        true
    }

    /// Record every path of `other`
    pub fn merge(&mut self, other: &Provenance) {
        for path in &other.paths {
            self.record(path);
        }
    }

    /// Recorded paths in recording order
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &[Vec<RecipeFrame>] {
        &self.paths
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Composition-ordered tree of the recipes that made changes
    ///
    /// Recipes that changed nothing themselves appear only as ancestors of
    /// recipes that did. The root recipe of a run is omitted unless it changed
    /// the source directly; its changed descendants then become the top level.
    #[must_use]
    pub fn descriptors(&self) -> Vec<RecipeDescriptor> {
        let mut roots: Vec<TrieNode<'_>> = Vec::new();
        for path in &self.paths {
            insert(&mut roots, path);
        }
        roots.sort_by_key(|n| n.frame.position);

        let mut out = Vec::new();
        for root in roots {
            if root.direct {
                out.push(root.into_descriptor());
            } else {
                out.extend(root.into_child_descriptors());
            }
        }
        out
    }

    /// Distinct recipe names of [`Provenance::descriptors`], pre-order
    #[must_use]
    pub fn recipe_names(&self) -> IndexSet<String> {
        self.descriptors()
            .iter()
            .flat_map(RecipeDescriptor::names)
            .map(str::to_string)
            .collect()
    }
}

struct TrieNode<'a> {
    frame: &'a RecipeFrame,
    direct: bool,
    children: Vec<TrieNode<'a>>,
}

impl<'a> TrieNode<'a> {
    fn new(frame: &'a RecipeFrame) -> Self {
        Self {
            frame,
            direct: false,
            children: Vec::new(),
        }
    }

    fn into_descriptor(self) -> RecipeDescriptor {
        RecipeDescriptor {
            name: self.frame.name.clone(),
            display_name: self.frame.display_name.clone(),
            children: self.into_child_descriptors(),
        }
    }

    fn into_child_descriptors(self) -> Vec<RecipeDescriptor> {
        let mut children = self.children;
        children.sort_by_key(|n| n.frame.position);
        children.into_iter().map(TrieNode::into_descriptor).collect()
    }
}

fn insert<'a>(level: &mut Vec<TrieNode<'a>>, path: &'a [RecipeFrame]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    let found = level.iter().position(|n| n.frame.same_slot(head));
    let pos = match found {
        Some(pos) => pos,
        None => {
            level.push(TrieNode::new(head));
            level.len() - 1
        }
    };

    let node = &mut level[pos];
    if rest.is_empty() {
        node.direct = true;
    } else {
        insert(&mut node.children, rest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(position: usize, name: &str) -> RecipeFrame {
        RecipeFrame::new(position, name, name)
    }

    fn root() -> RecipeFrame {
        frame(0, "root")
    }

    #[test]
    fn record_ignores_duplicates_and_empty_paths() {
        let mut provenance = Provenance::default();
        assert!(provenance.record(&[root(), frame(0, "a")]));
        assert!(!provenance.record(&[root(), frame(0, "a")]));
        assert!(!provenance.record(&[]));
        assert_eq!(provenance.paths().len(), 1);
    }

    #[test]
    fn root_without_direct_change_is_omitted() {
        let mut provenance = Provenance::default();
        provenance.record(&[root(), frame(0, "change1")]);
        provenance.record(&[root(), frame(2, "change2")]);

        let descriptors = provenance.descriptors();
        assert_eq!(
            descriptors,
            vec![
                RecipeDescriptor::leaf("change1", "change1"),
                RecipeDescriptor::leaf("change2", "change2"),
            ]
        );
    }

    #[test]
    fn root_with_direct_change_wraps_descendants() {
        let mut provenance = Provenance::default();
        provenance.record(&[root()]);
        provenance.record(&[root(), frame(1, "child")]);

        let descriptors = provenance.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "root");
        assert_eq!(descriptors[0].names(), vec!["root", "child"]);
    }

    #[test]
    fn unchanged_composites_wrap_changed_descendants() {
        let mut provenance = Provenance::default();
        provenance.record(&[root(), frame(0, "A"), frame(0, "B"), frame(0, "C")]);
        provenance.record(&[root(), frame(0, "A"), frame(0, "B"), frame(1, "D")]);
        provenance.record(&[root(), frame(1, "E"), frame(0, "F")]);

        let descriptors = provenance.descriptors();
        assert_eq!(descriptors.len(), 2);
        let b = descriptors[0].child("B").unwrap();
        assert_eq!(b.children.len(), 2);
        assert_eq!(b.names(), vec!["B", "C", "D"]);
        assert_eq!(descriptors[1].names(), vec!["E", "F"]);
    }

    #[test]
    fn siblings_follow_composition_order_not_recording_order() {
        let mut provenance = Provenance::default();
        provenance.record(&[root(), frame(3, "late")]);
        provenance.record(&[root(), frame(1, "early")]);

        let names: Vec<_> = provenance.recipe_names().into_iter().collect();
        assert_eq!(names, vec!["early".to_string(), "late".to_string()]);
    }

    #[test]
    fn same_name_at_different_points_stays_separate() {
        let mut provenance = Provenance::default();
        provenance.record(&[root(), frame(0, "fmt")]);
        provenance.record(&[root(), frame(1, "fmt")]);
        provenance.record(&[root(), frame(2, "wrap"), frame(0, "fmt")]);

        let descriptors = provenance.descriptors();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(provenance.recipe_names().len(), 2);
    }

    #[test]
    fn merge_unions_paths() {
        let mut a = Provenance::default();
        a.record(&[root(), frame(0, "x")]);
        let mut b = Provenance::default();
        b.record(&[root(), frame(0, "x")]);
        b.record(&[root(), frame(1, "y")]);

        a.merge(&b);
        assert_eq!(a.paths().len(), 2);
    }
}
