use std::sync::Arc;

use super::task::{Task, TaskId};

/// A task together with its ordered children.
///
/// Children are shared by reference so that a mutation only rebuilds the
/// path from the root to the node it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub task: Task,
    pub children: Vec<Arc<TaskNode>>,
}

impl TaskNode {
    pub fn leaf(task: Task) -> Self {
        TaskNode {
            task,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.task.id
    }

    /// Rebuild this node with a new child list, keeping the task fields
    pub fn with_children(&self, children: Vec<Arc<TaskNode>>) -> Arc<TaskNode> {
        Arc::new(TaskNode {
            task: self.task.clone(),
            children,
        })
    }

    /// Number of nodes in this subtree, including self
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}

/// Which sibling list an operation addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    Root,
    Children(TaskId),
}

impl Container {
    pub fn for_parent(parent: Option<&TaskId>) -> Self {
        match parent {
            Some(id) => Container::Children(id.clone()),
            None => Container::Root,
        }
    }

    pub fn parent_id(&self) -> Option<&TaskId> {
        match self {
            Container::Root => None,
            Container::Children(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Root => write!(f, "root"),
            Container::Children(id) => write!(f, "children of {}", id),
        }
    }
}

/// An ordered collection of task trees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    roots: Vec<Arc<TaskNode>>,
}

impl Forest {
    pub fn new(roots: Vec<Arc<TaskNode>>) -> Self {
        Forest { roots }
    }

    pub fn roots(&self) -> &[Arc<TaskNode>] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Arc<TaskNode>> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of tasks at every depth
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| r.size()).sum()
    }

    /// Depth-first, pre-order walk over every task with its depth (0 = root)
    pub fn walk(&self) -> Vec<(&Task, usize)> {
        fn visit<'a>(nodes: &'a [Arc<TaskNode>], depth: usize, out: &mut Vec<(&'a Task, usize)>) {
            for node in nodes {
                out.push((&node.task, depth));
                visit(&node.children, depth + 1, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        visit(&self.roots, 0, &mut out);
        out
    }

    /// Same-node check by reference, for change detection
    pub fn ptr_eq(&self, other: &Forest) -> bool {
        self.roots.len() == other.roots.len()
            && self
                .roots
                .iter()
                .zip(&other.roots)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}
