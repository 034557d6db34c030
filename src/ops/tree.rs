use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::forest::{Forest, TaskNode};
use crate::model::task::{Task, TaskId, TaskRow};
use crate::ops::task_ops::TreeError;

/// Build a forest from a flat, ordered row set.
///
/// Sibling order follows input order. A row whose parent is not in the set
/// is placed at the root level. Rows whose parent chain loops back on itself
/// never reach a root; the first of them (in input order) is promoted to root
/// to break the loop, repeatedly, until every row is placed.
pub fn build_forest(rows: &[TaskRow]) -> Result<Forest, TreeError> {
    let mut index: IndexMap<&TaskId, usize> = IndexMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if index.insert(row.id(), i).is_some() {
            tracing::error!(id = %row.id(), "duplicate task id in row set");
            return Err(TreeError::DuplicateId(row.id().clone()));
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut is_root = vec![false; rows.len()];

    for (&id, &i) in &index {
        let Some(parent_id) = rows[i].parent_id() else {
            is_root[i] = true;
            continue;
        };
        match index.get(parent_id) {
            Some(&p) if p != i => children[p].push(i),
            Some(_) => {
                tracing::warn!(%id, "task is its own parent; placing at root");
                is_root[i] = true;
            }
            None => {
                tracing::debug!(%id, %parent_id, "parent not in row set; placing at root");
                is_root[i] = true;
            }
        }
    }

    let mut placed = vec![false; rows.len()];
    for i in 0..rows.len() {
        if is_root[i] {
            mark_subtree(i, &children, &mut placed);
        }
    }
    while let Some(i) = placed.iter().position(|p| !p) {
        tracing::warn!(id = %rows[i].id(), "parent chain forms a cycle; placing at root");
        if let Some(&p) = rows[i].parent_id().and_then(|pid| index.get(pid)) {
            children[p].retain(|&c| c != i);
        }
        is_root[i] = true;
        mark_subtree(i, &children, &mut placed);
    }

    let roots = (0..rows.len())
        .filter(|&i| is_root[i])
        .map(|i| materialize(i, rows, &children))
        .collect();
    Ok(Forest::new(roots))
}

fn mark_subtree(start: usize, children: &[Vec<usize>], placed: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if placed[i] {
            continue;
        }
        placed[i] = true;
        stack.extend(children[i].iter().copied());
    }
}

fn materialize(i: usize, rows: &[TaskRow], children: &[Vec<usize>]) -> Arc<TaskNode> {
    Arc::new(TaskNode {
        task: rows[i].task.clone(),
        children: children[i]
            .iter()
            .map(|&c| materialize(c, rows, children))
            .collect(),
    })
}

/// Pre-order copy of every task in the forest
pub fn flatten(forest: &Forest) -> Vec<Task> {
    forest.walk().into_iter().map(|(t, _)| t.clone()).collect()
}
