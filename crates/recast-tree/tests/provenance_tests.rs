use proptest::prelude::*;
use recast_tree::{Provenance, RecipeFrame, SourcePath};

/// Recipe at each composition slot is named after the slot, e.g. `r0.2`
fn slot_name(positions: &[usize]) -> String {
    let parts: Vec<String> = positions.iter().map(ToString::to_string).collect();
    format!("r{}", parts.join("."))
}

fn frame_path(positions: &[usize]) -> Vec<RecipeFrame> {
    let mut path = vec![RecipeFrame::new(0, "root", "root")];
    for depth in 1..=positions.len() {
        let name = slot_name(&positions[..depth]);
        path.push(RecipeFrame::new(positions[depth - 1], name.clone(), name));
    }
    path
}

fn paths_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    proptest::collection::vec(proptest::collection::vec(0..3usize, 1..4), 0..8)
}

proptest! {
    #[test]
    fn prop_descriptors_ignore_recording_order(paths in paths_strategy()) {
        let mut forward = Provenance::default();
        let mut backward = Provenance::default();
        for steps in &paths {
            forward.record(&frame_path(steps));
        }
        for steps in paths.iter().rev() {
            backward.record(&frame_path(steps));
        }

        prop_assert_eq!(forward.descriptors(), backward.descriptors());
        prop_assert_eq!(forward.recipe_names(), backward.recipe_names());
    }

    #[test]
    fn prop_every_changing_recipe_is_named(paths in paths_strategy()) {
        let mut provenance = Provenance::default();
        for steps in &paths {
            provenance.record(&frame_path(steps));
        }

        let names = provenance.recipe_names();
        prop_assert!(!names.contains("root"));
        for steps in &paths {
            for depth in 1..=steps.len() {
                let expected = slot_name(&steps[..depth]);
                prop_assert!(names.contains(expected.as_str()));
            }
        }
    }

    #[test]
    fn prop_recording_twice_changes_nothing(paths in paths_strategy()) {
        let mut once = Provenance::default();
        for steps in &paths {
            once.record(&frame_path(steps));
        }
        let mut twice = once.clone();
        twice.merge(&once);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_child_path_round_trips(segments in proptest::collection::vec("[a-z]{1,6}", 0..5), leaf in "[a-z]{1,6}\\.rs") {
        let parent = SourcePath::new(segments);
        let child = parent.child(leaf.clone());

        prop_assert_eq!(child.parent(), Some(parent.clone()));
        prop_assert_eq!(child.segments().last(), Some(&leaf));
        prop_assert_eq!(child.to_string().parse::<SourcePath>().unwrap(), child);
    }
}
