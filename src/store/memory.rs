use std::cell::{Cell, RefCell};
use std::sync::mpsc;

use chrono::Utc;

use super::{ChangeEvent, RowTable, StoreError, Subscription, TaskStore};
use crate::model::task::{NewTask, TaskId, TaskPatch, TaskRow};

/// A store call, as recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FetchAll,
    Insert(String),
    Update(TaskId),
    Delete(TaskId),
    Reparent(TaskId, Option<TaskId>),
}

/// In-process store. Notifies subscribers after every successful write and
/// can be told to fail, for exercising persistence-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    table: RowTable,
    subscribers: Vec<(String, mpsc::Sender<ChangeEvent>)>,
    failures: Cell<usize>,
    calls: RefCell<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            table: RowTable::new(),
            ..Default::default()
        }
    }

    /// Make the next `n` calls fail with `StoreError::Unavailable`
    pub fn fail_next(&self, n: usize) {
        self.failures.set(n);
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn table(&self) -> &RowTable {
        &self.table
    }

    fn enter(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(call);
        let remaining = self.failures.get();
        if remaining > 0 {
            self.failures.set(remaining - 1);
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn notify(&mut self, owner: &str) {
        self.subscribers
            .retain(|(o, tx)| o != owner || tx.send(ChangeEvent).is_ok());
    }

    fn owner_of(&self, id: &TaskId) -> Option<String> {
        self.table.owner_of(id).map(str::to_string)
    }
}

impl TaskStore for MemoryStore {
    fn fetch_all(&self, owner: &str) -> Result<Vec<TaskRow>, StoreError> {
        self.enter(StoreCall::FetchAll)?;
        Ok(self.table.select(owner))
    }

    fn insert(&mut self, owner: &str, task: NewTask) -> Result<TaskRow, StoreError> {
        self.enter(StoreCall::Insert(task.text.clone()))?;
        let row = self.table.insert(owner, task, Utc::now())?;
        self.notify(owner);
        Ok(row)
    }

    fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        self.enter(StoreCall::Update(id.clone()))?;
        self.table.update(id, patch)?;
        if let Some(owner) = self.owner_of(id) {
            self.notify(&owner);
        }
        Ok(())
    }

    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        self.enter(StoreCall::Delete(id.clone()))?;
        let owner = self.owner_of(id);
        self.table.delete(id)?;
        if let Some(owner) = owner {
            self.notify(&owner);
        }
        Ok(())
    }

    fn reparent(&mut self, id: &TaskId, parent: Option<&TaskId>) -> Result<(), StoreError> {
        self.enter(StoreCall::Reparent(id.clone(), parent.cloned()))?;
        self.table.reparent(id, parent)?;
        if let Some(owner) = self.owner_of(id) {
            self.notify(&owner);
        }
        Ok(())
    }

    fn subscribe(&mut self, owner: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((owner.to_string(), tx));
        Ok(Subscription::new(rx))
    }
}
