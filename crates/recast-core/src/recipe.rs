//! Recipes
//!
//! A [`Recipe`] is a named transformation unit: an optional applicability
//! test, an optional visitor or bulk batch transform, and an ordered list of
//! child recipes. Recipes are assembled with [`RecipeBuilder`] and are
//! immutable once built, apart from appending children before a run.

use crate::config::SchedulerConfig;
use crate::context::ExecutionContext;
use crate::error::RecipeError;
use crate::result::RecipeRun;
use crate::scheduler::RecipeScheduler;
use recast_tree::{Accepts, RecipeDescriptor, SourceFile, Tree, TreeVisitor, VisitError, VisitResult};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Visitor over whole batch elements
///
/// Object-safe face of a [`TreeVisitor`]. Most recipes never implement this
/// directly; [`RecipeBuilder::visitor`] adapts a kind-specific visitor.
pub trait SourceVisitor<S: SourceFile>: Send {
    /// Whether this visitor understands `source`
    fn is_acceptable(&self, source: &S, ctx: &ExecutionContext) -> bool;

    /// Visit one source
    ///
    /// # Errors
    /// Returns [`VisitError`] when the source cannot be handled.
    fn visit_source(&mut self, source: S, ctx: &ExecutionContext) -> VisitResult<S>;
}

/// Adapts a [`TreeVisitor`] over kind `T` to any batch accepting `T`
///
/// Sources of another kind, or sources the visitor rejects, pass through
/// unchanged and never reach the inner visitor.
pub struct KindVisitor<T, V> {
    inner: V,
    _kind: PhantomData<fn() -> T>,
}

impl<T, V> KindVisitor<T, V> {
    /// Wrap a kind-specific visitor
    #[inline]
    #[must_use]
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            _kind: PhantomData,
        }
    }
}

impl<S, T, V> SourceVisitor<S> for KindVisitor<T, V>
where
    S: Accepts<T>,
    T: Tree,
    V: TreeVisitor<T, ExecutionContext> + Send,
{
    fn is_acceptable(&self, source: &S, ctx: &ExecutionContext) -> bool {
        <S as Accepts<T>>::kind(source)
            .is_some_and(|tree| TreeVisitor::<T, ExecutionContext>::is_acceptable(&self.inner, tree, ctx))
    }

    fn visit_source(&mut self, source: S, ctx: &ExecutionContext) -> VisitResult<S> {
        if !SourceVisitor::<S>::is_acceptable(self, &source, ctx) {
            return Ok(Some(source));
        }
        let inner = &mut self.inner;
        <S as Accepts<T>>::try_map_kind(source, |tree| {
            TreeVisitor::<T, ExecutionContext>::visit(inner, tree, ctx)
        })
    }
}

pub(crate) type VisitorFactory<S> = Arc<dyn Fn() -> Box<dyn SourceVisitor<S>> + Send + Sync>;

pub(crate) type BatchTransform<S> =
    Arc<dyn Fn(Vec<S>, &ExecutionContext) -> Result<Vec<S>, VisitError> + Send + Sync>;

fn kind_factory<S, T, V, F>(factory: F) -> VisitorFactory<S>
where
    S: Accepts<T>,
    T: Tree,
    V: TreeVisitor<T, ExecutionContext> + Send + 'static,
    F: Fn() -> V + Send + Sync + 'static,
{
    Arc::new(move || Box::new(KindVisitor::<T, V>::new(factory())) as Box<dyn SourceVisitor<S>>)
}

/// Named, composable transformation over a batch of `S`
///
/// # Application protocol
/// 1. If an applicability test is set and matches no source, the recipe and
///    all its children are skipped
/// 2. The batch transform runs, or else the visitor runs on each source
/// 3. Children run in order, each seeing the previous child's output
pub struct Recipe<S: SourceFile> {
    name: String,
    display_name: String,
    description: Option<String>,
    tags: Vec<String>,
    applicable_test: Option<VisitorFactory<S>>,
    single_source_applicable_test: Option<VisitorFactory<S>>,
    visitor: Option<VisitorFactory<S>>,
    batch_transform: Option<BatchTransform<S>>,
    causes_another_cycle: bool,
    children: Vec<Recipe<S>>,
}

impl<S: SourceFile> Recipe<S> {
    /// Start building a recipe
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecipeBuilder<S> {
        RecipeBuilder::new(name)
    }

    /// Recipe with no transform of its own, only children
    #[must_use]
    pub fn composite(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: None,
            tags: Vec::new(),
            applicable_test: None,
            single_source_applicable_test: None,
            visitor: None,
            batch_transform: None,
            causes_another_cycle: false,
            children: Vec::new(),
        }
    }

    /// Append a child, run after all existing children
    #[inline]
    #[must_use]
    pub fn add_child(mut self, child: Recipe<S>) -> Self {
        self.children.push(child);
        self
    }

    /// Stable name
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

    /// Longer explanation, if any
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Free-form tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Child recipes in execution order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Recipe<S>] {
        &self.children
    }

    /// Check if this recipe changes sources itself
    #[inline]
    #[must_use]
    pub fn has_transform(&self) -> bool {
        self.visitor.is_some() || self.batch_transform.is_some()
    }

    /// Check if this recipe or any descendant asks for another cycle
    #[must_use]
    pub fn causes_another_cycle(&self) -> bool {
        self.causes_another_cycle || self.children.iter().any(Recipe::causes_another_cycle)
    }

    /// Own flag, ignoring children
    #[inline]
    pub(crate) fn requests_another_cycle(&self) -> bool {
        self.causes_another_cycle
    }

    /// Full composition tree
    #[must_use]
    pub fn descriptor(&self) -> RecipeDescriptor {
        RecipeDescriptor {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            children: self.children.iter().map(Recipe::descriptor).collect(),
        }
    }

    /// Check that every recipe in the tree is well formed
    ///
    /// # Errors
    /// Returns [`RecipeError::InvalidRecipe`] for a blank name anywhere in the tree
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.name.trim().is_empty() {
            return Err(RecipeError::InvalidRecipe(
                "recipe name must not be blank".to_string(),
            ));
        }
        self.children.iter().try_for_each(Recipe::validate)
    }

    /// Run over `batch` with a fresh context and default scheduler
    ///
    /// Per-source failures are recorded in the discarded context; use
    /// [`Recipe::run_with`] to inspect them.
    ///
    /// # Errors
    /// Returns a fatal [`RecipeError`]
    pub fn run(&self, batch: Vec<S>) -> Result<RecipeRun<S>, RecipeError> {
        self.run_with(batch, &ExecutionContext::new())
    }

    /// Run over `batch` sharing `ctx`
    ///
    /// # Errors
    /// Returns a fatal [`RecipeError`] or one escalated by the context's error hook
    pub fn run_with(&self, batch: Vec<S>, ctx: &ExecutionContext) -> Result<RecipeRun<S>, RecipeError> {
        RecipeScheduler::new(SchedulerConfig::default()).run(self, batch, ctx)
    }

    pub(crate) fn applicable_test(&self) -> Option<&VisitorFactory<S>> {
        self.applicable_test.as_ref()
    }

    pub(crate) fn single_source_applicable_test(&self) -> Option<&VisitorFactory<S>> {
        self.single_source_applicable_test.as_ref()
    }

    pub(crate) fn visitor(&self) -> Option<&VisitorFactory<S>> {
        self.visitor.as_ref()
    }

    pub(crate) fn batch_transform(&self) -> Option<&BatchTransform<S>> {
        self.batch_transform.as_ref()
    }
}

impl<S: SourceFile> Clone for Recipe<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            applicable_test: self.applicable_test.clone(),
            single_source_applicable_test: self.single_source_applicable_test.clone(),
            visitor: self.visitor.clone(),
            batch_transform: self.batch_transform.clone(),
            causes_another_cycle: self.causes_another_cycle,
            children: self.children.clone(),
        }
    }
}

impl<S: SourceFile> fmt::Debug for Recipe<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("applicable_test", &self.applicable_test.is_some())
            .field("visitor", &self.visitor.is_some())
            .field("batch_transform", &self.batch_transform.is_some())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Recipe`]
pub struct RecipeBuilder<S: SourceFile> {
    recipe: Recipe<S>,
    display_name_set: bool,
}

impl<S: SourceFile> RecipeBuilder<S> {
    /// Create new builder; the display name defaults to the name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            recipe: Recipe::composite(name),
            display_name_set: false,
        }
    }

    /// Set display name
    #[inline]
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.recipe.display_name = display_name.into();
        self.display_name_set = true;
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.recipe.description = Some(description.into());
        self
    }

    /// Add a tag
    #[inline]
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.recipe.tags.push(tag.into());
        self
    }

    /// Visit every source of kind `T` with a fresh visitor from `factory`
    #[must_use]
    pub fn visitor<T, V, F>(mut self, factory: F) -> Self
    where
        S: Accepts<T>,
        T: Tree,
        V: TreeVisitor<T, ExecutionContext> + Send + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.recipe.visitor = Some(kind_factory::<S, T, V, F>(factory));
        self
    }

    /// Visit every source with a batch-level visitor from `factory`
    #[must_use]
    pub fn source_visitor<V, F>(mut self, factory: F) -> Self
    where
        V: SourceVisitor<S> + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.recipe.visitor = Some(Arc::new(move || Box::new(factory()) as Box<dyn SourceVisitor<S>>));
        self
    }

    /// Skip the recipe and its children unless the test matches some source
    ///
    /// The test matches a source when visiting it changes or deletes it.
    #[must_use]
    pub fn applicable_test<T, V, F>(mut self, factory: F) -> Self
    where
        S: Accepts<T>,
        T: Tree,
        V: TreeVisitor<T, ExecutionContext> + Send + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.recipe.applicable_test = Some(kind_factory::<S, T, V, F>(factory));
        self
    }

    /// Only visit sources the test matches; children are unaffected
    #[must_use]
    pub fn single_source_applicable_test<T, V, F>(mut self, factory: F) -> Self
    where
        S: Accepts<T>,
        T: Tree,
        V: TreeVisitor<T, ExecutionContext> + Send + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.recipe.single_source_applicable_test = Some(kind_factory::<S, T, V, F>(factory));
        self
    }

    /// Replace the per-source visit with a transform over the whole batch
    ///
    /// Sources missing from the output are deleted; sources with new ids are
    /// generated.
    #[must_use]
    pub fn batch_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Vec<S>, &ExecutionContext) -> Result<Vec<S>, VisitError> + Send + Sync + 'static,
    {
        self.recipe.batch_transform = Some(Arc::new(transform));
        self
    }

    /// Ask for another cycle whenever this recipe changes a source or
    /// writes a message
    #[inline]
    #[must_use]
    pub fn causes_another_cycle(mut self, yes: bool) -> Self {
        self.recipe.causes_another_cycle = yes;
        self
    }

    /// Append a child recipe
    #[inline]
    #[must_use]
    pub fn child(mut self, child: Recipe<S>) -> Self {
        self.recipe.children.push(child);
        self
    }

    /// Build recipe
    ///
    /// # Errors
    /// Returns [`RecipeError::InvalidRecipe`] if a name in the tree is blank
    pub fn build(self) -> Result<Recipe<S>, RecipeError> {
        let mut recipe = self.recipe;
        if !self.display_name_set {
            recipe.display_name = recipe.name.clone();
        }
        recipe.validate()?;
        Ok(recipe)
    }
}
