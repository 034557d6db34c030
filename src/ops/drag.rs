//! Drag-and-drop gesture handling.
//!
//! A gesture marks one task as active and remembers the forest as it was
//! when the drag began. Nothing is mutated until the drop. The drop resolves
//! against whatever forest the caller holds at that moment, so writes and
//! refetches that landed mid-gesture are kept. Cancelling hands the starting
//! snapshot back for callers that rendered speculative previews.

use crate::model::forest::{Container, Forest};
use crate::model::task::TaskId;
use crate::ops::task_ops::{self, TreeError};

/// What the pointer was over when the task was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The dedicated "promote to root" zone
    RootZone,
    /// Another task row
    Task(TaskId),
    /// The empty child placeholder rendered under a task with no children
    EmptyChildSlot(TaskId),
    /// No registered target under the pointer
    Outside,
}

/// Parent change that has to be written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReparentRequest {
    pub id: TaskId,
    pub parent: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Forest stays exactly as it was
    Unchanged,
    /// Sibling order changed; local presentation state only
    Reordered(Forest),
    /// The task changed parent
    Moved {
        forest: Forest,
        persist: ReparentRequest,
    },
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        active: TaskId,
        snapshot: Forest,
    },
}

/// One drag gesture at a time
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn active(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Dragging { active, .. } => Some(active),
            DragState::Idle => None,
        }
    }

    /// Begin dragging `id`. Starting again mid-gesture replaces the gesture.
    pub fn start(&mut self, forest: &Forest, id: &TaskId) -> Result<(), TreeError> {
        if task_ops::find(forest, id).is_none() {
            return Err(TreeError::NotFound(id.clone()));
        }
        tracing::debug!(%id, "drag started");
        self.state = DragState::Dragging {
            active: id.clone(),
            snapshot: forest.clone(),
        };
        Ok(())
    }

    /// Whether `forest` is still the one the gesture started from
    pub fn is_current(&self, forest: &Forest) -> bool {
        match &self.state {
            DragState::Dragging { snapshot, .. } => snapshot.ptr_eq(forest),
            DragState::Idle => false,
        }
    }

    /// What dropping here would do to `forest`, without ending the gesture
    pub fn preview(&self, forest: &Forest, target: &DropTarget, modifier: bool) -> Result<DropOutcome, TreeError> {
        match &self.state {
            DragState::Dragging { active, .. } => resolve_drop(forest, active, target, modifier),
            DragState::Idle => Ok(DropOutcome::Unchanged),
        }
    }

    /// Release the active task over `target`, resolved against `forest`. The
    /// session is idle afterwards, whatever the outcome.
    pub fn drop_on(&mut self, forest: &Forest, target: &DropTarget, modifier: bool) -> Result<DropOutcome, TreeError> {
        let DragState::Dragging { active, snapshot } = std::mem::take(&mut self.state) else {
            return Ok(DropOutcome::Unchanged);
        };
        if !snapshot.ptr_eq(forest) {
            tracing::debug!(%active, "forest changed during drag");
        }
        tracing::debug!(%active, ?target, modifier, "drop");
        resolve_drop(forest, &active, target, modifier)
    }

    /// Abort the gesture and return the forest captured at drag start
    pub fn cancel(&mut self) -> Option<Forest> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { snapshot, .. } => Some(snapshot),
            DragState::Idle => None,
        }
    }
}

/// Map a drop onto a forest change.
///
/// The root zone always promotes to root. Over a task, holding the modifier
/// nests under it; without the modifier the active task takes the target's
/// place in the target's sibling list, changing parent first if needed.
pub fn resolve_drop(
    forest: &Forest,
    active: &TaskId,
    target: &DropTarget,
    modifier: bool,
) -> Result<DropOutcome, TreeError> {
    match target {
        DropTarget::Outside => Ok(DropOutcome::Unchanged),
        DropTarget::RootZone => nest(forest, active, None),
        DropTarget::EmptyChildSlot(parent) => nest(forest, active, Some(parent)),
        DropTarget::Task(t) if t == active => Ok(DropOutcome::Unchanged),
        DropTarget::Task(t) if modifier => nest(forest, active, Some(t)),
        DropTarget::Task(t) => place_beside(forest, active, t),
    }
}

fn nest(forest: &Forest, active: &TaskId, parent: Option<&TaskId>) -> Result<DropOutcome, TreeError> {
    let current = task_ops::container_of(forest, active)
        .ok_or_else(|| TreeError::NotFound(active.clone()))?;
    if current.parent_id() == parent {
        return Ok(DropOutcome::Unchanged);
    }
    let next = task_ops::reparent(forest, active, parent)?;
    Ok(DropOutcome::Moved {
        forest: next,
        persist: ReparentRequest {
            id: active.clone(),
            parent: parent.cloned(),
        },
    })
}

fn place_beside(forest: &Forest, active: &TaskId, target: &TaskId) -> Result<DropOutcome, TreeError> {
    let target_container = task_ops::container_of(forest, target)
        .ok_or_else(|| TreeError::NotFound(target.clone()))?;
    let active_container = task_ops::container_of(forest, active)
        .ok_or_else(|| TreeError::NotFound(active.clone()))?;
    let index = target_index(forest, &target_container, target)?;

    if active_container == target_container {
        let next = task_ops::move_to_index(forest, active, index)?;
        return Ok(DropOutcome::Reordered(next));
    }

    let parent = target_container.parent_id();
    let moved = task_ops::reparent(forest, active, parent)?;
    let next = task_ops::move_to_index(&moved, active, index)?;
    Ok(DropOutcome::Moved {
        forest: next,
        persist: ReparentRequest {
            id: active.clone(),
            parent: parent.cloned(),
        },
    })
}

fn target_index(forest: &Forest, container: &Container, target: &TaskId) -> Result<usize, TreeError> {
    task_ops::siblings(forest, container)
        .and_then(|list| list.iter().position(|n| n.id() == target))
        .ok_or_else(|| TreeError::NotFound(target.clone()))
}
