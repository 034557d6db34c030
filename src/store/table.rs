use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StoreError, fetch_order};
use crate::model::task::{NewTask, Task, TaskId, TaskPatch, TaskRow};

/// The row set behind both store implementations, with the checks a
/// relational backend would enforce: foreign-key parents, cascading deletes,
/// and no parent cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowTable {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    rows: Vec<TaskRow>,
}

fn first_id() -> u64 {
    1
}

impl Default for RowTable {
    fn default() -> Self {
        RowTable::new()
    }
}

impl RowTable {
    pub fn new() -> Self {
        RowTable {
            next_id: first_id(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn get(&self, id: &TaskId) -> Option<&TaskRow> {
        self.rows.iter().find(|r| r.id() == id)
    }

    fn get_mut(&mut self, id: &TaskId) -> Result<&mut TaskRow, StoreError> {
        self.rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Owner of a row, for change fan-out
    pub fn owner_of(&self, id: &TaskId) -> Option<&str> {
        self.get(id).map(|r| r.owner_id.as_str())
    }

    /// Every row for `owner`, in fetch order
    pub fn select(&self, owner: &str) -> Vec<TaskRow> {
        let mut rows: Vec<TaskRow> = self
            .rows
            .iter()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(fetch_order);
        rows
    }

    pub fn insert(&mut self, owner: &str, new: NewTask, now: DateTime<Utc>) -> Result<TaskRow, StoreError> {
        if new.text.trim().is_empty() {
            return Err(StoreError::Rejected("task text is empty".into()));
        }
        if let Some(parent) = &new.parent_id {
            match self.get(parent) {
                None => return Err(StoreError::Rejected(format!("parent {} does not exist", parent))),
                Some(p) if p.owner_id != owner => {
                    return Err(StoreError::Rejected(format!("parent {} belongs to another owner", parent)));
                }
                Some(_) => {}
            }
        }

        let id = self.allocate_id();
        let mut task = Task::new(id, new.text);
        task.parent_id = new.parent_id;
        task.due_date = new.due_date;
        let row = TaskRow {
            owner_id: owner.to_string(),
            created_at: now,
            task,
        };
        self.rows.push(row.clone());
        Ok(row)
    }

    /// Next free numeric id. `next_id` may be missing or stale in a hand
    /// edited file, so it never goes below the highest numeric id on disk.
    fn allocate_id(&mut self) -> TaskId {
        let floor = self
            .rows
            .iter()
            .filter_map(|r| r.id().as_str().parse::<u64>().ok())
            .max()
            .map_or(first_id(), |n| n + 1);
        let n = self.next_id.max(floor);
        self.next_id = n + 1;
        TaskId::from(n)
    }

    pub fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        if patch.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(StoreError::Rejected("task text is empty".into()));
        }
        let row = self.get_mut(id)?;
        patch.apply_to(&mut row.task);
        Ok(())
    }

    /// Delete `id` and all of its descendants. Returns how many rows went.
    pub fn delete(&mut self, id: &TaskId) -> Result<usize, StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let mut doomed: HashSet<TaskId> = HashSet::from([id.clone()]);
        loop {
            let before = doomed.len();
            for row in &self.rows {
                if row.parent_id().is_some_and(|p| doomed.contains(p)) {
                    doomed.insert(row.id().clone());
                }
            }
            if doomed.len() == before {
                break;
            }
        }
        self.rows.retain(|r| !doomed.contains(r.id()));
        Ok(doomed.len())
    }

    pub fn reparent(&mut self, id: &TaskId, parent: Option<&TaskId>) -> Result<(), StoreError> {
        let Some(owner) = self.owner_of(id) else {
            return Err(StoreError::NotFound(id.clone()));
        };
        if let Some(parent) = parent {
            match self.get(parent) {
                None => return Err(StoreError::Rejected(format!("parent {} does not exist", parent))),
                Some(p) if p.owner_id != owner => {
                    return Err(StoreError::Rejected(format!("parent {} belongs to another owner", parent)));
                }
                Some(_) => {}
            }
            if self.is_ancestor_or_self(id, parent) {
                return Err(StoreError::Rejected(format!(
                    "moving {} under {} would create a cycle",
                    id, parent
                )));
            }
        }
        self.get_mut(id)?.task.parent_id = parent.cloned();
        Ok(())
    }

    /// Walk up from `start` and report whether `id` is on the chain
    fn is_ancestor_or_self(&self, id: &TaskId, start: &TaskId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(start);
        while let Some(c) = current {
            if c == id {
                return true;
            }
            if !seen.insert(c) {
                return false;
            }
            current = self.get(c).and_then(|r| r.parent_id());
        }
        false
    }
}
