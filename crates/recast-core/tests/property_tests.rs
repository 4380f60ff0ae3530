use proptest::prelude::*;
use recast_core::{ExecutionContext, Recipe};
use recast_test_utils::{append, counting, never_applicable, no_change, PlainText};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn batch_of(texts: &[String]) -> Vec<PlainText> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| PlainText::new(&format!("f{i}.txt"), text))
        .collect()
}

proptest! {
    #[test]
    fn prop_cancelled_run_is_identity(texts in proptest::collection::vec("[a-z ]{0,12}", 0..16)) {
        let batch = batch_of(&texts);
        let visits = Arc::new(AtomicUsize::new(0));
        let recipe = Recipe::composite("root")
            .add_child(append::<PlainText>("bang", "!"))
            .add_child(counting("count", &visits));
        let ctx = ExecutionContext::new();
        ctx.cancel();

        let run = recipe.run_with(batch.clone(), &ctx).unwrap();

        prop_assert!(run.is_unchanged());
        prop_assert_eq!(run.batch(), batch.as_slice());
        prop_assert_eq!(visits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prop_never_applicable_passes_batch_through(texts in proptest::collection::vec("[a-z]{0,8}", 0..16)) {
        let batch = batch_of(&texts);
        let visits = Arc::new(AtomicUsize::new(0));

        let run = never_applicable::<PlainText>("gated", &visits).run(batch.clone()).unwrap();

        prop_assert!(run.is_unchanged());
        prop_assert_eq!(run.batch(), batch.as_slice());
        prop_assert_eq!(visits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prop_no_op_recipe_reports_nothing(texts in proptest::collection::vec(".{0,8}", 0..16)) {
        let batch = batch_of(&texts);

        let run = no_change::<PlainText>("noop").run(batch.clone()).unwrap();

        prop_assert!(run.is_unchanged());
        prop_assert_eq!(run.batch(), batch.as_slice());
    }

    #[test]
    fn prop_every_changed_source_is_attributed(texts in proptest::collection::vec("[a-z]{0,8}", 1..16)) {
        let batch = batch_of(&texts);
        let recipe = Recipe::composite("root")
            .add_child(no_change::<PlainText>("noop"))
            .add_child(append("bang", "!"));

        let run = recipe.run(batch.clone()).unwrap();

        prop_assert_eq!(run.changed_count(), batch.len());
        for (result, before) in run.results().iter().zip(&batch) {
            prop_assert_eq!(result.before(), Some(before));
            prop_assert_eq!(result.recipe_names().len(), 1);
            prop_assert!(result.recipe_names().contains("bang"));
        }
    }

    #[test]
    fn prop_identity_survives_rewrite(texts in proptest::collection::vec("[a-z]{0,8}", 0..16)) {
        let batch = batch_of(&texts);

        let run = append::<PlainText>("bang", "?").run(batch.clone()).unwrap();

        let before: Vec<_> = batch.iter().map(recast_tree::Tree::id).collect();
        let after: Vec<_> = run.batch().iter().map(recast_tree::Tree::id).collect();
        prop_assert_eq!(before, after);
    }
}
