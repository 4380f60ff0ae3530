//! Recipe scheduler
//!
//! Drives a recipe tree over a batch until it settles:
//! 1. Check cancellation before every recipe invocation
//! 2. Gate the recipe and its children on the applicability test
//! 3. Apply the batch transform or the per-source visitor
//! 4. Diff by identity and record the recipe path for every change
//! 5. Thread the batch through the children in order
//!
//! Another cycle runs only when a recipe flagged with `causes_another_cycle`
//! changed a source or wrote a message during its own invocation, and the
//! cycle as a whole changed the batch or wrote a message.
//!
//! Per-source visits of one recipe are independent and run on the rayon pool
//! for large batches. Children always run sequentially.

use crate::config::SchedulerConfig;
use crate::context::ExecutionContext;
use crate::error::RecipeError;
use crate::ledger::ProvenanceLedger;
use crate::recipe::{Recipe, VisitorFactory};
use crate::result::{RecipeResult, RecipeRun};
use rayon::prelude::*;
use recast_tree::{RecipeFrame, SourceFile, Tree, TreeId};
use std::collections::{HashMap, HashSet};

/// Runs recipes over batches
#[derive(Debug, Clone, Default)]
pub struct RecipeScheduler {
    config: SchedulerConfig,
}

#[derive(Debug, Default, Clone, Copy)]
struct Diff {
    modified: usize,
    generated: usize,
    deleted: usize,
}

impl Diff {
    fn is_empty(self) -> bool {
        self.modified + self.generated + self.deleted == 0
    }
}

/// State of one pass over the recipe tree
#[derive(Debug, Default)]
struct Pass {
    stack: Vec<RecipeFrame>,
    another_cycle: bool,
}

impl RecipeScheduler {
    /// Create new scheduler
    #[inline]
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run `recipe` over `batch` until it settles or `max_cycles` is reached
    ///
    /// # Errors
    /// - [`RecipeError::Config`] / [`RecipeError::InvalidRecipe`] before any work
    /// - [`RecipeError::ContractViolation`] for duplicate or replaced identities
    /// - Any error the context's error hook chooses to escalate
    pub fn run<S: SourceFile>(
        &self,
        recipe: &Recipe<S>,
        batch: Vec<S>,
        ctx: &ExecutionContext,
    ) -> Result<RecipeRun<S>, RecipeError> {
        self.config.validate()?;
        recipe.validate()?;
        ensure_unique_ids(recipe.name(), &batch)?;

        tracing::info!(
            recipe = recipe.name(),
            sources = batch.len(),
            max_cycles = self.config.max_cycles,
            "recipe run started"
        );

        let original = batch.clone();
        let mut ledger = ProvenanceLedger::new();
        let mut current = batch;
        let mut cycles = 0;

        while cycles < self.config.max_cycles {
            if ctx.is_cancelled() {
                tracing::info!(recipe = recipe.name(), cycles, "run cancelled");
                break;
            }
            cycles += 1;
            ctx.reset_new_messages();

            let before = current.clone();
            let mut pass = Pass::default();
            current = self.schedule(recipe, 0, current, ctx, &mut ledger, &mut pass)?;

            let changed = current != before;
            let another = pass.another_cycle && (changed || ctx.has_new_messages());
            tracing::debug!(recipe = recipe.name(), cycle = cycles, changed, another, "cycle finished");

            if cycles >= self.config.min_cycles && !another {
                break;
            }
        }

        let (results, batch) = collect_results(original, current, &ledger);
        tracing::info!(
            recipe = recipe.name(),
            cycles,
            changed = results.len(),
            "recipe run finished"
        );
        Ok(RecipeRun::new(results, batch, cycles))
    }

    fn schedule<S: SourceFile>(
        &self,
        recipe: &Recipe<S>,
        position: usize,
        batch: Vec<S>,
        ctx: &ExecutionContext,
        ledger: &mut ProvenanceLedger,
        pass: &mut Pass,
    ) -> Result<Vec<S>, RecipeError> {
        if ctx.is_cancelled() {
            tracing::debug!(recipe = recipe.name(), "cancelled, skipping recipe");
            return Ok(batch);
        }

        pass.stack
            .push(RecipeFrame::new(position, recipe.name(), recipe.display_name()));
        let result = self.schedule_frame(recipe, batch, ctx, ledger, pass);
        pass.stack.pop();
        result
    }

    fn schedule_frame<S: SourceFile>(
        &self,
        recipe: &Recipe<S>,
        batch: Vec<S>,
        ctx: &ExecutionContext,
        ledger: &mut ProvenanceLedger,
        pass: &mut Pass,
    ) -> Result<Vec<S>, RecipeError> {
        if let Some(test) = recipe.applicable_test() {
            if !any_source_matches(recipe, test, &batch, ctx)? {
                tracing::debug!(recipe = recipe.name(), "not applicable, skipping subtree");
                return Ok(batch);
            }
        }

        let mut batch = batch;
        if recipe.has_transform() {
            let writes = ctx.message_writes();
            let after = self.transform(recipe, &batch, ctx)?;
            let diff = record_changes(&batch, &after, &pass.stack, ledger);
            tracing::trace!(
                recipe = recipe.name(),
                modified = diff.modified,
                generated = diff.generated,
                deleted = diff.deleted,
                "recipe applied"
            );
            if !diff.is_empty() {
                tracing::debug!(recipe = recipe.name(), depth = pass.stack.len(), "recipe made changes");
            }
            let wrote_messages = ctx.message_writes() != writes;
            if recipe.requests_another_cycle() && (!diff.is_empty() || wrote_messages) {
                tracing::debug!(recipe = recipe.name(), "recipe asked for another cycle");
                pass.another_cycle = true;
            }
            batch = after;
        }

        for (position, child) in recipe.children().iter().enumerate() {
            batch = self.schedule(child, position, batch, ctx, ledger, pass)?;
        }
        Ok(batch)
    }

    fn transform<S: SourceFile>(
        &self,
        recipe: &Recipe<S>,
        batch: &[S],
        ctx: &ExecutionContext,
    ) -> Result<Vec<S>, RecipeError> {
        if let Some(transform) = recipe.batch_transform() {
            return match transform(batch.to_vec(), ctx) {
                Ok(output) => {
                    ensure_unique_ids(recipe.name(), &output)?;
                    Ok(output)
                }
                Err(cause) => {
                    ctx.on_error(RecipeError::TransformFailed {
                        recipe: recipe.name().to_string(),
                        cause,
                    })?;
                    Ok(batch.to_vec())
                }
            };
        }

        let Some(factory) = recipe.visitor() else {
            return Ok(batch.to_vec());
        };

        let visited: Vec<Option<S>> =
            if self.config.parallel && batch.len() >= self.config.parallel_threshold {
                batch
                    .par_iter()
                    .map(|source| visit_source(recipe, factory, source, ctx))
                    .collect::<Result<_, _>>()?
            } else {
                batch
                    .iter()
                    .map(|source| visit_source(recipe, factory, source, ctx))
                    .collect::<Result<_, _>>()?
            };

        Ok(visited.into_iter().flatten().collect())
    }
}

fn visit_source<S: SourceFile>(
    recipe: &Recipe<S>,
    factory: &VisitorFactory<S>,
    source: &S,
    ctx: &ExecutionContext,
) -> Result<Option<S>, RecipeError> {
    if let Some(test) = recipe.single_source_applicable_test() {
        if !source_matches(recipe, test, source, ctx)? {
            return Ok(Some(source.clone()));
        }
    }

    let id = source.id();
    let mut visitor = factory();
    match visitor.visit_source(source.clone(), ctx) {
        Ok(Some(after)) if after.id() != id => Err(RecipeError::contract_violation(
            recipe.name(),
            format!(
                "visitor replaced source {id} at '{}' with {}",
                source.source_path(),
                after.id()
            ),
        )),
        Ok(after) => Ok(after),
        Err(cause) => {
            ctx.on_error(RecipeError::VisitFailed {
                recipe: recipe.name().to_string(),
                source_path: source.source_path().clone(),
                cause,
            })?;
            Ok(Some(source.clone()))
        }
    }
}

fn any_source_matches<S: SourceFile>(
    recipe: &Recipe<S>,
    test: &VisitorFactory<S>,
    batch: &[S],
    ctx: &ExecutionContext,
) -> Result<bool, RecipeError> {
    for source in batch {
        if source_matches(recipe, test, source, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A test matches a source when visiting it changes or deletes it
fn source_matches<S: SourceFile>(
    recipe: &Recipe<S>,
    test: &VisitorFactory<S>,
    source: &S,
    ctx: &ExecutionContext,
) -> Result<bool, RecipeError> {
    let mut visitor = test();
    if !visitor.is_acceptable(source, ctx) {
        return Ok(false);
    }
    match visitor.visit_source(source.clone(), ctx) {
        Ok(Some(after)) => Ok(after != *source),
        Ok(None) => Ok(true),
        Err(cause) => {
            ctx.on_error(RecipeError::ApplicabilityFailed {
                recipe: recipe.name().to_string(),
                source_path: source.source_path().clone(),
                cause,
            })?;
            Ok(false)
        }
    }
}

fn record_changes<S: SourceFile>(
    before: &[S],
    after: &[S],
    stack: &[RecipeFrame],
    ledger: &mut ProvenanceLedger,
) -> Diff {
    let previous: HashMap<TreeId, &S> = before.iter().map(|s| (s.id(), s)).collect();
    let mut surviving = HashSet::with_capacity(after.len());
    let mut diff = Diff::default();

    for source in after {
        let id = source.id();
        surviving.insert(id);
        match previous.get(&id) {
            Some(prev) if *prev == source => {}
            Some(_) => {
                diff.modified += 1;
                ledger.record_change(id, stack);
            }
            None => {
                diff.generated += 1;
                ledger.record_change(id, stack);
            }
        }
    }

    for source in before {
        let id = source.id();
        if !surviving.contains(&id) {
            diff.deleted += 1;
            ledger.record_change(id, stack);
        }
    }
    diff
}

fn ensure_unique_ids<S: SourceFile>(recipe: &str, batch: &[S]) -> Result<(), RecipeError> {
    let mut seen = HashSet::with_capacity(batch.len());
    for source in batch {
        if !seen.insert(source.id()) {
            return Err(RecipeError::contract_violation(
                recipe,
                format!("duplicate source id {} at '{}'", source.id(), source.source_path()),
            ));
        }
    }
    Ok(())
}

/// Net diff of the run
///
/// Surviving changes are stamped with this run's provenance. Unchanged
/// survivors lose any provenance left by an earlier run.
fn collect_results<S: SourceFile>(
    original: Vec<S>,
    batch: Vec<S>,
    ledger: &ProvenanceLedger,
) -> (Vec<RecipeResult<S>>, Vec<S>) {
    let order: Vec<TreeId> = original.iter().map(Tree::id).collect();
    let mut before_by_id: HashMap<TreeId, S> = original.into_iter().map(|s| (s.id(), s)).collect();
    let mut results = Vec::new();
    let mut stamped = Vec::with_capacity(batch.len());

    for source in batch {
        let id = source.id();
        let before = before_by_id.remove(&id);
        if before.as_ref().is_some_and(|b| *b == source) {
            // provenance only describes this run
            let stale = source.markers().provenance().is_some();
            stamped.push(if stale {
                let markers = source.markers().without_provenance();
                source.with_markers(markers)
            } else {
                source
            });
            continue;
        }

        let after = match ledger.get(&id) {
            Some(provenance) => {
                let markers = source.markers().with_provenance(provenance.clone());
                source.with_markers(markers)
            }
            None => source,
        };
        results.push(RecipeResult::new(
            before,
            Some(after.clone()),
            ledger.descriptor_tree(&id),
            ledger.flatten_names(&id),
        ));
        stamped.push(after);
    }

    for id in order {
        if let Some(before) = before_by_id.remove(&id) {
            results.push(RecipeResult::new(
                Some(before),
                None,
                ledger.descriptor_tree(&id),
                ledger.flatten_names(&id),
            ));
        }
    }

    (results, stamped)
}
