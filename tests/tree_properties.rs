//! Property tests: arbitrary edit sequences keep the forest well formed.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use padd::model::forest::{Container, Forest};
use padd::model::task::{Task, TaskId, TaskRow};
use padd::ops::task_ops::{self, TreeError};
use padd::ops::tree::{build_forest, flatten};
use padd::store::fetch_order;

#[derive(Debug, Clone)]
enum Op {
    AddRoot(IdStyle),
    AddChild(usize, IdStyle),
    Delete(usize),
    Reparent(usize, Option<usize>),
    Toggle(usize),
    MoveTo(usize, usize),
}

/// Stores hand out integers, but ids are opaque text
#[derive(Debug, Clone, Copy)]
enum IdStyle {
    Number,
    Prefixed,
    ZeroPadded,
}

impl IdStyle {
    fn render(self, n: u64) -> String {
        match self {
            IdStyle::Number => n.to_string(),
            IdStyle::Prefixed => format!("t{}", n),
            IdStyle::ZeroPadded => format!("0{}", n),
        }
    }
}

fn id_style() -> impl Strategy<Value = IdStyle> {
    prop_oneof![Just(IdStyle::Number), Just(IdStyle::Prefixed), Just(IdStyle::ZeroPadded)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => id_style().prop_map(Op::AddRoot),
        3 => (any::<usize>(), id_style()).prop_map(|(p, style)| Op::AddChild(p, style)),
        1 => any::<usize>().prop_map(Op::Delete),
        3 => (any::<usize>(), proptest::option::of(any::<usize>())).prop_map(|(a, b)| Op::Reparent(a, b)),
        1 => any::<usize>().prop_map(Op::Toggle),
        2 => (any::<usize>(), 0usize..6).prop_map(|(a, i)| Op::MoveTo(a, i)),
    ]
}

fn ids(forest: &Forest) -> Vec<TaskId> {
    flatten(forest).into_iter().map(|t| t.id).collect()
}

fn pick(ids: &[TaskId], n: usize) -> Option<TaskId> {
    (!ids.is_empty()).then(|| ids[n % ids.len()].clone())
}

fn apply(forest: &Forest, op: &Op, next_id: &mut u64) -> Result<Forest, TreeError> {
    let present = ids(forest);
    let fresh = |next_id: &mut u64, style: IdStyle| {
        *next_id += 1;
        Task::new(style.render(*next_id), format!("task {}", next_id))
    };
    match op {
        Op::AddRoot(style) => task_ops::insert_root(forest, fresh(next_id, *style)),
        Op::AddChild(p, style) => match pick(&present, *p) {
            Some(parent) => task_ops::insert_child(forest, &parent, fresh(next_id, *style)),
            None => task_ops::insert_root(forest, fresh(next_id, *style)),
        },
        Op::Delete(a) => match pick(&present, *a) {
            Some(id) => task_ops::delete_subtree(forest, &id),
            None => Ok(forest.clone()),
        },
        Op::Reparent(a, b) => match pick(&present, *a) {
            Some(id) => {
                let target = b.and_then(|b| pick(&present, b));
                task_ops::reparent(forest, &id, target.as_ref())
            }
            None => Ok(forest.clone()),
        },
        Op::Toggle(a) => match pick(&present, *a) {
            Some(id) => task_ops::toggle_completed(forest, &id),
            None => Ok(forest.clone()),
        },
        Op::MoveTo(a, i) => match pick(&present, *a) {
            Some(id) => task_ops::move_to_index(forest, &id, *i),
            None => Ok(forest.clone()),
        },
    }
}

fn to_rows(forest: &Forest) -> Vec<TaskRow> {
    let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    flatten(forest)
        .into_iter()
        .map(|task| TaskRow {
            owner_id: "crew".into(),
            created_at,
            task,
        })
        .collect()
}

/// Every parent_id matches the node it actually sits under
fn assert_parent_links(forest: &Forest) {
    for root in forest.roots() {
        assert_eq!(root.task.parent_id, None);
    }
    for (task, _) in forest.walk() {
        let node = task_ops::find(forest, &task.id).unwrap();
        for child in &node.children {
            assert_eq!(child.task.parent_id.as_ref(), Some(&task.id));
        }
    }
}

proptest! {
    #[test]
    fn edit_sequences_keep_forest_well_formed(ops in proptest::collection::vec(op(), 1..40)) {
        let mut forest = Forest::default();
        let mut next_id = 0;

        for op in &ops {
            let before = forest.clone();
            match apply(&forest, op, &mut next_id) {
                Ok(next) => forest = next,
                Err(TreeError::CycleRejected { active, target }) => {
                    let node = task_ops::find(&before, &active).unwrap();
                    prop_assert!(active == target || task_ops::contains_descendant(node, &target));
                }
                Err(e) => prop_assert!(false, "unexpected error {:?} for {:?}", e, op),
            }

            // acyclic and unique: a pre-order walk sees every id once
            let seen = ids(&forest);
            let unique: HashSet<&TaskId> = seen.iter().collect();
            prop_assert_eq!(unique.len(), seen.len());
            prop_assert_eq!(seen.len(), forest.len());
            assert_parent_links(&forest);
        }

        let rebuilt = build_forest(&to_rows(&forest)).unwrap();
        prop_assert_eq!(&rebuilt, &forest);
        let again = build_forest(&to_rows(&rebuilt)).unwrap();
        prop_assert_eq!(again, rebuilt);

        // every row shares one created_at, so ids alone decide the fetch order
        let mut rows = to_rows(&forest);
        rows.sort_by(fetch_order);
        prop_assert!(rows.windows(2).all(|w| w[0].task.id < w[1].task.id));
    }

    #[test]
    fn reorder_roots_keeps_the_same_tasks(n in 1usize..8, rot in 0usize..8) {
        let tasks: Vec<Task> = (1..=n as u64).map(|i| Task::new(i, format!("t{}", i))).collect();
        let mut forest = Forest::default();
        for t in tasks {
            forest = task_ops::insert_root(&forest, t).unwrap();
        }
        let mut order: Vec<TaskId> = forest.roots().iter().map(|r| r.id().clone()).collect();
        order.rotate_left(rot % n);

        let reordered = task_ops::reorder_siblings(&forest, &Container::Root, &order).unwrap();
        let got: Vec<TaskId> = reordered.roots().iter().map(|r| r.id().clone()).collect();
        prop_assert_eq!(got, order);
    }
}
