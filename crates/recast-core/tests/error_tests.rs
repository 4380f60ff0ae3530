use recast_core::{ExecutionContext, Recipe, RecipeError};
use recast_test_utils::{append, failing, text_batch, FailText, PlainText};
use recast_tree::{SourceFile, VisitError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_default_hook_records_and_continues() {
    let root = Recipe::composite("root")
        .add_child(failing::<PlainText>("broken", "cannot parse"))
        .add_child(append("bang", "!"));
    let ctx = ExecutionContext::new();

    let run = root.run_with(text_batch(&["a", "b"]), &ctx).unwrap();

    assert_eq!(ctx.error_count(), 2);
    assert!(ctx.error_messages()[0].contains("broken"));
    assert_eq!(run.changed_count(), 2);
    for result in run.results() {
        let names: Vec<_> = result.recipe_names().iter().collect();
        assert_eq!(names, vec!["bang"]);
    }
}

#[test]
fn test_escalating_hook_aborts_run() {
    let root = Recipe::composite("root")
        .add_child(failing::<PlainText>("broken", "cannot parse"))
        .add_child(append("bang", "!"));
    let ctx = ExecutionContext::new().with_error_handler(Err);

    let err = root.run_with(text_batch(&["a"]), &ctx).unwrap_err();

    match err {
        RecipeError::VisitFailed {
            recipe,
            source_path,
            ..
        } => {
            assert_eq!(recipe, "broken");
            assert_eq!(source_path.to_string(), "src/file0.txt");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_hook_sees_every_failure() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let ctx = ExecutionContext::new().with_error_handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    failing::<PlainText>("broken", "nope")
        .run_with(text_batch(&["a", "b", "c"]), &ctx)
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.error_count(), 0);
}

#[test]
fn test_failed_batch_transform_leaves_batch() {
    let recipe = Recipe::builder("explode")
        .batch_transform(|_batch: Vec<PlainText>, _ctx: &ExecutionContext| {
            Err(VisitError::failed("disk on fire"))
        })
        .build()
        .unwrap();
    let batch = text_batch(&["a"]);
    let ctx = ExecutionContext::new();

    let run = recipe.run_with(batch.clone(), &ctx).unwrap();

    assert!(run.is_unchanged());
    assert_eq!(run.batch(), batch.as_slice());
    assert!(matches!(
        ctx.take_errors().as_slice(),
        [RecipeError::TransformFailed { .. }]
    ));
}

#[test]
fn test_duplicate_ids_from_batch_transform_are_fatal() {
    let recipe = Recipe::builder("clone")
        .batch_transform(|mut batch: Vec<PlainText>, _ctx: &ExecutionContext| {
            let first = batch[0].clone();
            batch.push(first);
            Ok(batch)
        })
        .build()
        .unwrap();
    let ctx = ExecutionContext::new().with_error_handler(|_| Ok(()));

    let err = recipe.run_with(text_batch(&["a"]), &ctx).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, RecipeError::ContractViolation { ref recipe, .. } if recipe == "clone"));
}

#[test]
fn test_duplicate_ids_in_input_are_fatal() {
    let text = PlainText::new("a.txt", "a");

    let err = append::<PlainText>("bang", "!")
        .run(vec![text.clone(), text])
        .unwrap_err();

    assert!(matches!(err, RecipeError::ContractViolation { .. }));
}

#[test]
fn test_blank_child_name_is_rejected_at_run() {
    let root = Recipe::composite("root").add_child(Recipe::<PlainText>::composite(""));

    let err = root.run(text_batch(&["a"])).unwrap_err();

    assert!(matches!(err, RecipeError::InvalidRecipe(_)));
}

#[test]
fn test_failing_applicability_test_skips_recipe() {
    let recipe = Recipe::builder("guarded")
        .applicable_test::<PlainText, _, _>(|| FailText("bad probe".to_string()))
        .visitor::<PlainText, _, _>(|| recast_test_utils::Append("!".to_string()))
        .build()
        .unwrap();
    let ctx = ExecutionContext::new();

    let run = recipe.run_with(text_batch(&["a"]), &ctx).unwrap();

    assert!(run.is_unchanged());
    let errors = ctx.take_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], RecipeError::ApplicabilityFailed { .. }));
    assert_eq!(errors[0].recipe(), Some("guarded"));
}

#[test]
fn test_failed_source_passes_through_unchanged() {
    let batch = text_batch(&["a"]);
    let ctx = ExecutionContext::new();

    let run = failing::<PlainText>("broken", "nope")
        .run_with(batch.clone(), &ctx)
        .unwrap();

    assert_eq!(run.batch()[0], batch[0]);
    assert!(run.batch()[0].markers().provenance().is_none());
}
