//! Testing utilities for the recast workspace
//!
//! Shared source kinds, canned recipes and tracing setup.

#![allow(missing_docs)]

use recast_core::{ExecutionContext, Recipe};
use recast_tree::{
    Accepts, Markers, SourceFile, SourcePath, Tree, TreeId, TreeVisitor, VisitError, VisitResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

/// Flat text file
#[derive(Debug, Clone, PartialEq)]
pub struct PlainText {
    id: TreeId,
    path: SourcePath,
    markers: Markers,
    pub text: String,
}

impl PlainText {
    pub fn new(path: &str, text: &str) -> Self {
        Self {
            id: TreeId::random(),
            path: path.parse().unwrap_or_else(|_| SourcePath::single(path)),
            markers: Markers::empty(),
            text: text.to_string(),
        }
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self
        }
    }
}

impl Tree for PlainText {
    fn id(&self) -> TreeId {
        self.id
    }
}

impl SourceFile for PlainText {
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

/// Heading with nested subsections
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    id: TreeId,
    pub title: String,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(title: &str) -> Self {
        Self {
            id: TreeId::random(),
            title: title.to_string(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: Section) -> Self {
        self.children.push(child);
        self
    }

    /// Titles in pre-order
    pub fn titles(&self) -> Vec<String> {
        let mut out = vec![self.title.clone()];
        for child in &self.children {
            out.extend(child.titles());
        }
        out
    }
}

impl Tree for Section {
    fn id(&self) -> TreeId {
        self.id
    }

    fn try_map_children<E, F>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(Self) -> Result<Option<Self>, E>,
    {
        let mut children = Vec::with_capacity(self.children.len());
        for child in self.children {
            if let Some(child) = f(child)? {
                children.push(child);
            }
        }
        Ok(Self { children, ..self })
    }
}

/// Structured document whose body is a section tree
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    id: TreeId,
    path: SourcePath,
    markers: Markers,
    pub root: Section,
}

impl Outline {
    pub fn new(path: &str, root: Section) -> Self {
        Self {
            id: TreeId::random(),
            path: path.parse().unwrap_or_else(|_| SourcePath::single(path)),
            markers: Markers::empty(),
            root,
        }
    }
}

impl Tree for Outline {
    fn id(&self) -> TreeId {
        self.id
    }
}

impl SourceFile for Outline {
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

impl Accepts<Section> for Outline {
    fn kind(&self) -> Option<&Section> {
        Some(&self.root)
    }

    fn try_map_kind<E, F>(self, f: F) -> Result<Option<Self>, E>
    where
        F: FnOnce(Section) -> Result<Option<Section>, E>,
    {
        let Self {
            id,
            path,
            markers,
            root,
        } = self;
        Ok(f(root)?.map(|root| Self {
            id,
            path,
            markers,
            root,
        }))
    }
}

/// Batch element mixing both kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Text(PlainText),
    Outline(Outline),
}

impl Document {
    pub fn as_text(&self) -> Option<&PlainText> {
        match self {
            Self::Text(text) => Some(text),
            Self::Outline(_) => None,
        }
    }

    pub fn as_outline(&self) -> Option<&Outline> {
        match self {
            Self::Outline(outline) => Some(outline),
            Self::Text(_) => None,
        }
    }
}

impl From<PlainText> for Document {
    fn from(text: PlainText) -> Self {
        Self::Text(text)
    }
}

impl From<Outline> for Document {
    fn from(outline: Outline) -> Self {
        Self::Outline(outline)
    }
}

impl Tree for Document {
    fn id(&self) -> TreeId {
        match self {
            Self::Text(text) => text.id(),
            Self::Outline(outline) => outline.id(),
        }
    }
}

impl SourceFile for Document {
    fn source_path(&self) -> &SourcePath {
        match self {
            Self::Text(text) => text.source_path(),
            Self::Outline(outline) => outline.source_path(),
        }
    }

    fn markers(&self) -> &Markers {
        match self {
            Self::Text(text) => text.markers(),
            Self::Outline(outline) => outline.markers(),
        }
    }

    fn with_markers(self, markers: Markers) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.with_markers(markers)),
            Self::Outline(outline) => Self::Outline(outline.with_markers(markers)),
        }
    }
}

impl Accepts<PlainText> for Document {
    fn kind(&self) -> Option<&PlainText> {
        self.as_text()
    }

    fn try_map_kind<E, F>(self, f: F) -> Result<Option<Self>, E>
    where
        F: FnOnce(PlainText) -> Result<Option<PlainText>, E>,
    {
        match self {
            Self::Text(text) => Ok(f(text)?.map(Self::Text)),
            other @ Self::Outline(_) => Ok(Some(other)),
        }
    }
}

impl Accepts<Section> for Document {
    fn kind(&self) -> Option<&Section> {
        self.as_outline().map(|outline| &outline.root)
    }

    fn try_map_kind<E, F>(self, f: F) -> Result<Option<Self>, E>
    where
        F: FnOnce(Section) -> Result<Option<Section>, E>,
    {
        match self {
            Self::Outline(outline) => {
                Ok(<Outline as Accepts<Section>>::try_map_kind(outline, f)?.map(Self::Outline))
            }
            other @ Self::Text(_) => Ok(Some(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Visitors
// ---------------------------------------------------------------------------

pub struct Prepend(pub String);

impl TreeVisitor<PlainText, ExecutionContext> for Prepend {
    fn visit_node(&mut self, text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        let next = format!("{}{}", self.0, text.text);
        Ok(Some(text.with_text(next)))
    }
}

pub struct Append(pub String);

impl TreeVisitor<PlainText, ExecutionContext> for Append {
    fn visit_node(&mut self, text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        let next = format!("{}{}", text.text, self.0);
        Ok(Some(text.with_text(next)))
    }
}

/// Identity visitor
pub struct Untouched;

impl TreeVisitor<PlainText, ExecutionContext> for Untouched {}

pub struct DeleteText;

impl TreeVisitor<PlainText, ExecutionContext> for DeleteText {
    fn visit_node(&mut self, _text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        Ok(None)
    }
}

pub struct FailText(pub String);

impl TreeVisitor<PlainText, ExecutionContext> for FailText {
    fn visit_node(&mut self, _text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        Err(VisitError::failed(self.0.clone()))
    }
}

/// Counts visits, then appends `!`
pub struct CountVisits(pub Arc<AtomicUsize>);

impl TreeVisitor<PlainText, ExecutionContext> for CountVisits {
    fn visit_node(&mut self, text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        self.0.fetch_add(1, Ordering::SeqCst);
        let next = format!("{}!", text.text);
        Ok(Some(text.with_text(next)))
    }
}

/// Adds a search-result marker when the text contains the needle
pub struct FindText(pub String);

impl TreeVisitor<PlainText, ExecutionContext> for FindText {
    fn visit_node(&mut self, text: PlainText, _ctx: &ExecutionContext) -> VisitResult<PlainText> {
        if !text.text.contains(&self.0) {
            return Ok(Some(text));
        }
        let markers = text.markers().with_search_result(Some(self.0.clone()));
        Ok(Some(text.with_markers(markers)))
    }
}

pub struct UppercaseTitles;

impl TreeVisitor<Section, ExecutionContext> for UppercaseTitles {
    fn visit_node(&mut self, section: Section, _ctx: &ExecutionContext) -> VisitResult<Section> {
        let title = section.title.to_uppercase();
        Ok(Some(Section { title, ..section }))
    }
}

// ---------------------------------------------------------------------------
// Canned recipes
// ---------------------------------------------------------------------------

fn leaf<S: SourceFile>(builder: recast_core::RecipeBuilder<S>) -> Recipe<S> {
    builder.build().expect("fixture recipe is valid")
}

pub fn prepend<S: Accepts<PlainText>>(name: &str, prefix: &str) -> Recipe<S> {
    let prefix = prefix.to_string();
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(move || Prepend(prefix.clone())))
}

pub fn append<S: Accepts<PlainText>>(name: &str, suffix: &str) -> Recipe<S> {
    let suffix = suffix.to_string();
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(move || Append(suffix.clone())))
}

pub fn no_change<S: Accepts<PlainText>>(name: &str) -> Recipe<S> {
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(|| Untouched))
}

pub fn delete_by_visitor<S: Accepts<PlainText>>(name: &str) -> Recipe<S> {
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(|| DeleteText))
}

pub fn delete_by_batch<S: SourceFile>(name: &str) -> Recipe<S> {
    leaf(Recipe::builder(name).batch_transform(|_batch, _ctx| Ok(Vec::new())))
}

/// Appends one new text file to the batch
pub fn generate<S>(name: &str, path: &str, text: &str) -> Recipe<S>
where
    S: SourceFile + From<PlainText>,
{
    let (path, text) = (path.to_string(), text.to_string());
    leaf(Recipe::builder(name).batch_transform(move |mut batch: Vec<S>, _ctx| {
        batch.push(PlainText::new(&path, &text).into());
        Ok(batch)
    }))
}

pub fn failing<S: Accepts<PlainText>>(name: &str, message: &str) -> Recipe<S> {
    let message = message.to_string();
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(move || FailText(message.clone())))
}

pub fn counting<S: Accepts<PlainText>>(name: &str, visits: &Arc<AtomicUsize>) -> Recipe<S> {
    let visits = Arc::clone(visits);
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(move || CountVisits(Arc::clone(&visits))))
}

/// Counting recipe gated on a test that never matches
pub fn never_applicable<S: Accepts<PlainText>>(name: &str, visits: &Arc<AtomicUsize>) -> Recipe<S> {
    let visits = Arc::clone(visits);
    leaf(
        Recipe::builder(name)
            .applicable_test::<PlainText, _, _>(|| Untouched)
            .visitor::<PlainText, _, _>(move || CountVisits(Arc::clone(&visits))),
    )
}

pub fn find_text<S: Accepts<PlainText>>(name: &str, needle: &str) -> Recipe<S> {
    let needle = needle.to_string();
    leaf(Recipe::builder(name).visitor::<PlainText, _, _>(move || FindText(needle.clone())))
}

pub fn uppercase_titles<S: Accepts<Section>>(name: &str) -> Recipe<S> {
    leaf(Recipe::builder(name).visitor::<Section, _, _>(|| UppercaseTitles))
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn text_batch(texts: &[&str]) -> Vec<PlainText> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| PlainText::new(&format!("src/file{i}.txt"), text))
        .collect()
}

pub fn sample_outline() -> Outline {
    Outline::new(
        "docs/guide.md",
        Section::new("guide")
            .with_child(Section::new("install"))
            .with_child(Section::new("usage").with_child(Section::new("advanced"))),
    )
}

/// Install a test-friendly subscriber; `RUST_LOG` overrides the `warn` default
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
