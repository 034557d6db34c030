use std::collections::HashMap;
use std::sync::Arc;

use crate::model::forest::{Container, Forest, TaskNode};
use crate::model::task::{Task, TaskId, TaskPatch};

/// Error type for tree operations.
///
/// `NotFound` and `CycleRejected` are ordinary outcomes of a user intent.
/// The remaining variants mean the caller handed over malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("cannot move {active} under {target}: {active} would become its own ancestor")]
    CycleRejected { active: TaskId, target: TaskId },
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("new order for {container} is not a permutation of its current children")]
    NotAPermutation { container: Container },
}

impl TreeError {
    /// True for errors that indicate a caller bug rather than a rejected intent
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            TreeError::DuplicateId(_) | TreeError::NotAPermutation { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a task node by id (depth-first, pre-order).
pub fn find<'a>(forest: &'a Forest, id: &TaskId) -> Option<&'a Arc<TaskNode>> {
    find_in_list(forest.roots(), id)
}

fn find_in_list<'a>(nodes: &'a [Arc<TaskNode>], id: &TaskId) -> Option<&'a Arc<TaskNode>> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_in_list(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Whether `id` appears anywhere below `node` (not counting `node` itself).
pub fn contains_descendant(node: &TaskNode, id: &TaskId) -> bool {
    node.children
        .iter()
        .any(|c| c.id() == id || contains_descendant(c, id))
}

/// The sibling list a task currently sits in.
pub fn container_of(forest: &Forest, id: &TaskId) -> Option<Container> {
    if forest.roots().iter().any(|r| r.id() == id) {
        return Some(Container::Root);
    }
    parent_in_list(forest.roots(), id).map(|p| Container::Children(p.id().clone()))
}

fn parent_in_list<'a>(nodes: &'a [Arc<TaskNode>], id: &TaskId) -> Option<&'a Arc<TaskNode>> {
    for node in nodes {
        if node.children.iter().any(|c| c.id() == id) {
            return Some(node);
        }
        if let Some(p) = parent_in_list(&node.children, id) {
            return Some(p);
        }
    }
    None
}

/// The nodes of one sibling list, or `None` if the container's owner is absent.
pub fn siblings<'a>(forest: &'a Forest, container: &Container) -> Option<&'a [Arc<TaskNode>]> {
    match container {
        Container::Root => Some(forest.roots()),
        Container::Children(id) => find(forest, id).map(|n| n.children.as_slice()),
    }
}

/// Ancestor chain of a task, root first, excluding the task itself.
pub fn ancestors<'a>(forest: &'a Forest, id: &TaskId) -> Option<Vec<&'a Task>> {
    fn walk<'a>(nodes: &'a [Arc<TaskNode>], id: &TaskId, path: &mut Vec<&'a Task>) -> bool {
        for node in nodes {
            if node.id() == id {
                return true;
            }
            path.push(&node.task);
            if walk(&node.children, id, path) {
                return true;
            }
            path.pop();
        }
        false
    }
    let mut path = Vec::new();
    walk(forest.roots(), id, &mut path).then_some(path)
}

/// Nesting depth of a task; roots are at 0.
pub fn depth_of(forest: &Forest, id: &TaskId) -> Option<usize> {
    ancestors(forest, id).map(|chain| chain.len())
}

// ---------------------------------------------------------------------------
// Path rewriting
// ---------------------------------------------------------------------------

enum Edit {
    Replace(Arc<TaskNode>),
    Remove,
}

/// Apply `edit` to the node with `id` and rebuild only its ancestor chain.
/// Returns `None` if the id is not in `nodes`.
fn edit_list(
    nodes: &[Arc<TaskNode>],
    id: &TaskId,
    edit: &mut dyn FnMut(&Arc<TaskNode>) -> Edit,
) -> Option<Vec<Arc<TaskNode>>> {
    for (i, node) in nodes.iter().enumerate() {
        if node.id() == id {
            let mut out = nodes.to_vec();
            match edit(node) {
                Edit::Replace(replacement) => out[i] = replacement,
                Edit::Remove => {
                    out.remove(i);
                }
            }
            return Some(out);
        }
        if let Some(children) = edit_list(&node.children, id, edit) {
            let mut out = nodes.to_vec();
            out[i] = node.with_children(children);
            return Some(out);
        }
    }
    None
}

fn edit_forest(
    forest: &Forest,
    id: &TaskId,
    edit: &mut dyn FnMut(&Arc<TaskNode>) -> Edit,
) -> Result<Forest, TreeError> {
    edit_list(forest.roots(), id, edit)
        .map(Forest::new)
        .ok_or_else(|| TreeError::NotFound(id.clone()))
}

fn replace_task(forest: &Forest, id: &TaskId, f: impl Fn(&mut Task)) -> Result<Forest, TreeError> {
    edit_forest(forest, id, &mut |node| {
        let mut task = node.task.clone();
        f(&mut task);
        Edit::Replace(Arc::new(TaskNode {
            task,
            children: node.children.clone(),
        }))
    })
}

fn append_child(forest: &Forest, parent_id: &TaskId, child: Arc<TaskNode>) -> Result<Forest, TreeError> {
    edit_forest(forest, parent_id, &mut |parent| {
        let mut children = parent.children.clone();
        children.push(child.clone());
        Edit::Replace(parent.with_children(children))
    })
}

/// Remove a subtree and hand it back intact.
fn detach(forest: &Forest, id: &TaskId) -> Result<(Forest, Arc<TaskNode>), TreeError> {
    let mut removed = None;
    let rest = edit_forest(forest, id, &mut |node| {
        removed = Some(node.clone());
        Edit::Remove
    })?;
    let node = removed.ok_or_else(|| TreeError::NotFound(id.clone()))?;
    Ok((rest, node))
}

// ---------------------------------------------------------------------------
// Insert / delete
// ---------------------------------------------------------------------------

/// Append a new task to the end of `parent_id`'s children.
pub fn insert_child(forest: &Forest, parent_id: &TaskId, mut task: Task) -> Result<Forest, TreeError> {
    if find(forest, &task.id).is_some() {
        return Err(TreeError::DuplicateId(task.id));
    }
    task.parent_id = Some(parent_id.clone());
    append_child(forest, parent_id, Arc::new(TaskNode::leaf(task)))
}

/// Append a new task to the end of the root list.
pub fn insert_root(forest: &Forest, mut task: Task) -> Result<Forest, TreeError> {
    if find(forest, &task.id).is_some() {
        return Err(TreeError::DuplicateId(task.id));
    }
    task.parent_id = None;
    let mut roots = forest.roots().to_vec();
    roots.push(Arc::new(TaskNode::leaf(task)));
    Ok(Forest::new(roots))
}

/// Remove a task together with its whole subtree.
pub fn delete_subtree(forest: &Forest, id: &TaskId) -> Result<Forest, TreeError> {
    detach(forest, id).map(|(rest, _)| rest)
}

// ---------------------------------------------------------------------------
// Field edits
// ---------------------------------------------------------------------------

pub fn toggle_completed(forest: &Forest, id: &TaskId) -> Result<Forest, TreeError> {
    replace_task(forest, id, |task| task.completed = !task.completed)
}

/// Merge the present fields of `patch` into one task.
pub fn update_fields(forest: &Forest, id: &TaskId, patch: &TaskPatch) -> Result<Forest, TreeError> {
    replace_task(forest, id, |task| patch.apply_to(task))
}

// ---------------------------------------------------------------------------
// Move operations
// ---------------------------------------------------------------------------

/// Move a task (with its subtree) under `new_parent`, or to the root list
/// when `new_parent` is `None`. The task lands at the end of its new list.
///
/// Refuses to move a task under itself or under one of its descendants.
pub fn reparent(forest: &Forest, active_id: &TaskId, new_parent: Option<&TaskId>) -> Result<Forest, TreeError> {
    let active = find(forest, active_id).ok_or_else(|| TreeError::NotFound(active_id.clone()))?;

    if let Some(target_id) = new_parent {
        if find(forest, target_id).is_none() {
            return Err(TreeError::NotFound(target_id.clone()));
        }
        if target_id == active_id || contains_descendant(active, target_id) {
            tracing::warn!(active = %active_id, target = %target_id, "reparent rejected: cycle");
            return Err(TreeError::CycleRejected {
                active: active_id.clone(),
                target: target_id.clone(),
            });
        }
    }

    let (detached, node) = detach(forest, active_id)?;
    let mut task = node.task.clone();
    task.parent_id = new_parent.cloned();
    let moved = Arc::new(TaskNode {
        task,
        children: node.children.clone(),
    });

    match new_parent {
        None => {
            let mut roots = detached.into_roots();
            roots.push(moved);
            Ok(Forest::new(roots))
        }
        Some(target_id) => append_child(&detached, target_id, moved),
    }
}

/// Replace the order of one sibling list. `order` must name every current
/// sibling exactly once.
pub fn reorder_siblings(forest: &Forest, container: &Container, order: &[TaskId]) -> Result<Forest, TreeError> {
    let current = siblings(forest, container).ok_or_else(|| match container {
        Container::Children(id) => TreeError::NotFound(id.clone()),
        Container::Root => TreeError::NotFound(TaskId::from("root")),
    })?;

    let Some(permuted) = permute(current, order) else {
        tracing::error!(%container, "reorder is not a permutation of current siblings");
        return Err(TreeError::NotAPermutation {
            container: container.clone(),
        });
    };

    match container {
        Container::Root => Ok(Forest::new(permuted)),
        Container::Children(parent_id) => edit_forest(forest, parent_id, &mut |parent| {
            Edit::Replace(parent.with_children(permuted.clone()))
        }),
    }
}

fn permute(current: &[Arc<TaskNode>], order: &[TaskId]) -> Option<Vec<Arc<TaskNode>>> {
    if current.len() != order.len() {
        return None;
    }
    let mut by_id: HashMap<&TaskId, &Arc<TaskNode>> = current.iter().map(|n| (n.id(), n)).collect();
    order
        .iter()
        .map(|id| by_id.remove(id).cloned())
        .collect()
}

/// Move a task to `index` within its current sibling list.
/// An index past the end places it last.
pub fn move_to_index(forest: &Forest, id: &TaskId, index: usize) -> Result<Forest, TreeError> {
    let container = container_of(forest, id).ok_or_else(|| TreeError::NotFound(id.clone()))?;
    let mut order: Vec<TaskId> = siblings(forest, &container)
        .unwrap_or_default()
        .iter()
        .map(|n| n.id().clone())
        .filter(|sid| sid != id)
        .collect();
    order.insert(index.min(order.len()), id.clone());
    reorder_siblings(forest, &container, &order)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
