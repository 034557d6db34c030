//! The remote row store the forest is built from.
//!
//! The store is authoritative. The client fetches every row for an owner,
//! writes single-row mutations, and listens for payload-free change events
//! that tell it to fetch again.

pub mod memory;
pub mod table;

use std::any::Any;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crate::io::lock::LockError;
use crate::model::task::{NewTask, TaskId, TaskPatch, TaskRow};

pub use memory::MemoryStore;
pub use table::RowTable;

/// Error type for store calls. Every variant is a persistence failure from
/// the client's point of view; nothing is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("task not found in store: {0}")]
    NotFound(TaskId),
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("could not watch store: {0}")]
    Watch(#[from] notify::Error),
}

/// "Something in the tasks collection changed." Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent;

/// Receiving end of a change subscription.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    _guard: Option<Box<dyn Any + Send>>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Subscription { rx, _guard: None }
    }

    /// Keep `guard` (e.g. a filesystem watcher) alive as long as the subscription
    pub fn with_guard(rx: mpsc::Receiver<ChangeEvent>, guard: Box<dyn Any + Send>) -> Self {
        Subscription {
            rx,
            _guard: Some(guard),
        }
    }

    /// Non-blocking poll. Returns the number of events drained; several
    /// queued events need only one refetch.
    pub fn poll(&self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    /// Block until an event arrives or `timeout` passes
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// CRUD + subscribe surface of the remote store
pub trait TaskStore {
    /// Every row owned by `owner`, in fetch order (see [`fetch_order`])
    fn fetch_all(&self, owner: &str) -> Result<Vec<TaskRow>, StoreError>;

    fn insert(&mut self, owner: &str, task: NewTask) -> Result<TaskRow, StoreError>;

    fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError>;

    /// Delete a row and every row below it
    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError>;

    /// Change only the row's parent
    fn reparent(&mut self, id: &TaskId, parent: Option<&TaskId>) -> Result<(), StoreError>;

    fn subscribe(&mut self, owner: &str) -> Result<Subscription, StoreError>;
}

/// Fetch order: due date ascending with undated rows last, then creation
/// time, then id.
pub fn fetch_order(a: &TaskRow, b: &TaskRow) -> Ordering {
    let due = match (a.task.due_date, b.task.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due.then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.task.id.cmp(&b.task.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_helpers::{epoch, row};
    use chrono::Duration as Delta;

    #[test]
    fn undated_rows_sort_last() {
        let mut rows = vec![row("1", None, "undated"), row("2", None, "late"), row("3", None, "soon")];
        rows[1].task.due_date = Some(epoch() + Delta::days(2));
        rows[2].task.due_date = Some(epoch() + Delta::days(1));
        rows.sort_by(fetch_order);
        let ids: Vec<&str> = rows.iter().map(|r| r.task.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn creation_time_then_id_break_ties() {
        let mut rows = vec![row("10", None, "b"), row("9", None, "a"), row("1", None, "newest")];
        rows[2].created_at = epoch() + Delta::seconds(5);
        rows.sort_by(fetch_order);
        let ids: Vec<&str> = rows.iter().map(|r| r.task.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "1"]);
    }

    #[test]
    fn poll_drains_all_pending_events() {
        let (tx, rx) = mpsc::channel();
        let sub = Subscription::new(rx);
        assert_eq!(sub.poll(), 0);
        tx.send(ChangeEvent).unwrap();
        tx.send(ChangeEvent).unwrap();
        assert_eq!(sub.poll(), 2);
        assert_eq!(sub.poll(), 0);
    }
}
