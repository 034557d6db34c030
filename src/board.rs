//! Presentation state for one owner's tasks.
//!
//! A [`Board`] holds the current forest, the store it came from, the drag
//! gesture in progress and the queue of unsaved dossier edits. Structural
//! writes are checked against the local forest first, then sent to the store,
//! and applied locally only once the store accepts them. Dossier edits go the
//! other way: they show up locally at once and reach the store after the
//! auto-save window.

use std::time::{Duration, Instant};

use crate::model::forest::{Container, Forest};
use crate::model::task::{NewTask, TaskId, TaskPatch};
use crate::ops::autosave::AutoSave;
use crate::ops::drag::{DragSession, DropOutcome, DropTarget};
use crate::ops::task_ops::{self, TreeError};
use crate::ops::tree::{build_forest, flatten};
use crate::store::{StoreError, Subscription, TaskStore};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("store error: {0}")]
    Persistence(#[from] StoreError),
}

pub struct Board<S: TaskStore> {
    store: S,
    owner: String,
    forest: Forest,
    drag: DragSession,
    autosave: AutoSave,
    subscription: Option<Subscription>,
}

impl<S: TaskStore> Board<S> {
    /// An empty board. Call [`Board::refresh`] to load it.
    pub fn new(store: S, owner: impl Into<String>, debounce: Duration) -> Self {
        Board {
            store,
            owner: owner.into(),
            forest: Forest::default(),
            drag: DragSession::new(),
            autosave: AutoSave::new(debounce),
            subscription: None,
        }
    }

    /// Create a board and fetch its forest
    pub fn open(store: S, owner: impl Into<String>, debounce: Duration) -> Result<Self, BoardError> {
        let mut board = Self::new(store, owner, debounce);
        board.refresh()?;
        Ok(board)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn autosave(&self) -> &AutoSave {
        &self.autosave
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Throw the local forest away and rebuild it from the store. Edits still
    /// waiting for auto-save are laid back on top so they do not flicker out.
    pub fn refresh(&mut self) -> Result<(), BoardError> {
        let rows = self.store.fetch_all(&self.owner).inspect_err(|e| {
            tracing::warn!(owner = %self.owner, error = %e, "refetch failed, keeping last forest");
        })?;
        let mut forest = build_forest(&rows)?;

        let mut orphaned = Vec::new();
        let queued: Vec<TaskId> = self.autosave.ids().cloned().collect();
        for id in queued {
            let Some(patch) = self.autosave.pending(&id) else {
                continue;
            };
            match task_ops::update_fields(&forest, &id, patch) {
                Ok(next) => forest = next,
                Err(_) => orphaned.push(id),
            }
        }
        for id in orphaned {
            tracing::debug!(%id, "dropping queued edits for a task that is gone");
            self.autosave.discard(&id);
        }

        if let Some(active) = self.drag.active()
            && task_ops::find(&forest, active).is_none()
        {
            tracing::debug!(%active, "dragged task is gone, dropping the gesture");
            self.drag.cancel();
        }

        tracing::debug!(owner = %self.owner, rows = rows.len(), "forest rebuilt");
        self.forest = forest;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Structural writes
    // -----------------------------------------------------------------------

    /// Insert a task at the root or under `task.parent_id`. Returns the id the
    /// store assigned.
    pub fn add_task(&mut self, task: NewTask) -> Result<TaskId, BoardError> {
        if let Some(parent) = &task.parent_id
            && task_ops::find(&self.forest, parent).is_none()
        {
            return Err(TreeError::NotFound(parent.clone()).into());
        }
        let row = self.persist(|store, owner| store.insert(owner, task))?;
        let id = row.id().clone();
        let local = match row.task.parent_id.clone() {
            Some(parent) => task_ops::insert_child(&self.forest, &parent, row.task),
            None => task_ops::insert_root(&self.forest, row.task),
        };
        match local {
            Ok(next) => self.forest = next,
            // The forest was stale; the store is right
            Err(_) => self.refresh()?,
        }
        Ok(id)
    }

    pub fn toggle(&mut self, id: &TaskId) -> Result<(), BoardError> {
        let next = task_ops::toggle_completed(&self.forest, id)?;
        let completed = task_ops::find(&next, id).is_some_and(|n| n.task.completed);
        self.persist(|store, _| store.update(id, &TaskPatch::completed(completed)))?;
        self.forest = next;
        Ok(())
    }

    /// Write `patch` straight through, bypassing the auto-save queue
    pub fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<(), BoardError> {
        let next = task_ops::update_fields(&self.forest, id, patch)?;
        self.persist(|store, _| store.update(id, patch))?;
        self.forest = next;
        Ok(())
    }

    /// Delete a task and its subtree, dropping any queued edits for them
    pub fn delete(&mut self, id: &TaskId) -> Result<(), BoardError> {
        let doomed: Vec<TaskId> = match task_ops::find(&self.forest, id) {
            Some(node) => flatten(&Forest::new(vec![node.clone()]))
                .into_iter()
                .map(|t| t.id)
                .collect(),
            None => return Err(TreeError::NotFound(id.clone()).into()),
        };
        let next = task_ops::delete_subtree(&self.forest, id)?;
        self.persist(|store, _| store.delete(id))?;
        for gone in &doomed {
            self.autosave.discard(gone);
        }
        self.forest = next;
        Ok(())
    }

    /// Move a task under `parent`, or to the roots when `parent` is `None`
    pub fn reparent(&mut self, id: &TaskId, parent: Option<&TaskId>) -> Result<(), BoardError> {
        let next = task_ops::reparent(&self.forest, id, parent)?;
        self.persist(|store, _| store.reparent(id, parent))?;
        self.forest = next;
        Ok(())
    }

    /// Reorder one sibling list. Local only; the store keeps its own order.
    pub fn reorder(&mut self, container: &Container, order: &[TaskId]) -> Result<(), BoardError> {
        self.forest = task_ops::reorder_siblings(&self.forest, container, order)?;
        Ok(())
    }

    fn persist<T>(&mut self, call: impl FnOnce(&mut S, &str) -> Result<T, StoreError>) -> Result<T, BoardError> {
        call(&mut self.store, &self.owner).map_err(|e| {
            tracing::warn!(owner = %self.owner, error = %e, "store write failed");
            BoardError::Persistence(e)
        })
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    pub fn begin_drag(&mut self, id: &TaskId) -> Result<(), BoardError> {
        Ok(self.drag.start(&self.forest, id)?)
    }

    /// What releasing over `target` would do right now
    pub fn preview_drop(&self, target: &DropTarget, modifier: bool) -> Result<DropOutcome, BoardError> {
        Ok(self.drag.preview(&self.forest, target, modifier)?)
    }

    /// Finish the gesture against the current forest. A parent change is
    /// written before it is shown; a pure reorder is shown without touching
    /// the store.
    pub fn drop_on(&mut self, target: &DropTarget, modifier: bool) -> Result<(), BoardError> {
        match self.drag.drop_on(&self.forest, target, modifier)? {
            DropOutcome::Unchanged => {}
            DropOutcome::Reordered(next) => self.forest = next,
            DropOutcome::Moved { forest, persist } => {
                self.persist(|store, _| store.reparent(&persist.id, persist.parent.as_ref()))?;
                self.forest = forest;
            }
        }
        Ok(())
    }

    /// Abandon the gesture. The board never shows previews in its forest, so
    /// the forest stays as it is, including writes made mid-drag.
    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    // -----------------------------------------------------------------------
    // Dossier auto-save
    // -----------------------------------------------------------------------

    /// Show `patch` at once and queue it for the store
    pub fn edit_dossier(&mut self, id: &TaskId, patch: TaskPatch, now: Instant) -> Result<(), BoardError> {
        self.forest = task_ops::update_fields(&self.forest, id, &patch)?;
        self.autosave.queue(id.clone(), patch, now);
        Ok(())
    }

    /// Write every queued patch whose quiet period is over
    pub fn flush_due(&mut self, now: Instant) -> Result<usize, BoardError> {
        let due = self.autosave.take_due(now);
        self.flush(due, now)
    }

    /// Write everything queued, due or not
    pub fn flush_all(&mut self, now: Instant) -> Result<usize, BoardError> {
        let all = self.autosave.take_all();
        self.flush(all, now)
    }

    fn flush(&mut self, batch: Vec<(TaskId, TaskPatch)>, now: Instant) -> Result<usize, BoardError> {
        let mut written = 0;
        let mut first_error = None;
        for (id, patch) in batch {
            match self.store.update(&id, &patch) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::warn!(%id, error = %e, "auto-save failed, will retry");
                    self.autosave.requeue(id, patch, now);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(BoardError::Persistence(e)),
            None => Ok(written),
        }
    }

    // -----------------------------------------------------------------------
    // Change notifications
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self) -> Result<(), BoardError> {
        let sub = self.store.subscribe(&self.owner)?;
        self.subscription = Some(sub);
        Ok(())
    }

    /// Refetch if any change arrived since the last poll. Returns whether it did.
    pub fn poll_changes(&mut self) -> Result<bool, BoardError> {
        let changed = self.subscription.as_ref().is_some_and(|s| s.poll() > 0);
        if changed {
            self.refresh()?;
        }
        Ok(changed)
    }

    /// Block up to `timeout` for a change, then refetch. Returns whether one came.
    pub fn wait_for_change(&mut self, timeout: Duration) -> Result<bool, BoardError> {
        let Some(sub) = &self.subscription else {
            return Ok(false);
        };
        if !sub.wait(timeout) {
            return Ok(false);
        }
        // Editors tend to write in bursts
        std::thread::sleep(Duration::from_millis(50));
        sub.poll();
        self.refresh()?;
        Ok(true)
    }
}
