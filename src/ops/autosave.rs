use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::model::task::{TaskId, TaskPatch};

#[derive(Debug, Clone)]
struct Pending {
    patch: TaskPatch,
    last_edit: Instant,
}

/// Debounced write queue for dossier edits.
///
/// Edits to the same task merge into one patch. A task's patch becomes due
/// once no edit for it has arrived for the debounce window.
#[derive(Debug, Clone)]
pub struct AutoSave {
    debounce: Duration,
    pending: IndexMap<TaskId, Pending>,
}

impl AutoSave {
    pub fn new(debounce: Duration) -> Self {
        AutoSave {
            debounce,
            pending: IndexMap::new(),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Tasks with queued edits, oldest first
    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.pending.keys()
    }

    pub fn pending(&self, id: &TaskId) -> Option<&TaskPatch> {
        self.pending.get(id).map(|p| &p.patch)
    }

    /// Record an edit and restart the task's quiet period
    pub fn queue(&mut self, id: TaskId, patch: TaskPatch, now: Instant) {
        if patch.is_empty() {
            return;
        }
        match self.pending.get_mut(&id) {
            Some(p) => {
                p.patch.merge(patch);
                p.last_edit = now;
            }
            None => {
                self.pending.insert(
                    id,
                    Pending {
                        patch,
                        last_edit: now,
                    },
                );
            }
        }
    }

    /// Put back a patch whose write failed. Edits queued since it was taken
    /// stay on top of it.
    pub fn requeue(&mut self, id: TaskId, mut patch: TaskPatch, now: Instant) {
        if let Some(newer) = self.pending.shift_remove(&id) {
            patch.merge(newer.patch);
        }
        self.pending.insert(
            id,
            Pending {
                patch,
                last_edit: now,
            },
        );
    }

    /// Drop anything queued for a task (it was deleted)
    pub fn discard(&mut self, id: &TaskId) {
        self.pending.shift_remove(id);
    }

    /// Remove and return every patch whose quiet period has elapsed
    pub fn take_due(&mut self, now: Instant) -> Vec<(TaskId, TaskPatch)> {
        let due: Vec<TaskId> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_edit) >= self.debounce)
            .map(|(id, _)| id.clone())
            .collect();
        due.into_iter()
            .filter_map(|id| self.pending.shift_remove(&id).map(|p| (id, p.patch)))
            .collect()
    }

    /// Remove and return everything, due or not
    pub fn take_all(&mut self) -> Vec<(TaskId, TaskPatch)> {
        self.pending.drain(..).map(|(id, p)| (id, p.patch)).collect()
    }

    /// When the earliest pending patch becomes due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.last_edit + self.debounce).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(800);

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    #[test]
    fn edits_merge_and_wait_for_quiet() {
        let t0 = Instant::now();
        let mut save = AutoSave::new(WINDOW);
        save.queue(id("t1"), TaskPatch::details("draft"), t0);
        save.queue(id("t1"), TaskPatch::details("draft two"), t0 + Duration::from_millis(500));

        // the second edit restarted the window
        assert!(save.take_due(t0 + Duration::from_millis(900)).is_empty());

        let due = save.take_due(t0 + Duration::from_millis(1300));
        assert_eq!(due, vec![(id("t1"), TaskPatch::details("draft two"))]);
        assert!(save.is_empty());
    }

    #[test]
    fn tasks_debounce_independently() {
        let t0 = Instant::now();
        let mut save = AutoSave::new(WINDOW);
        save.queue(id("a"), TaskPatch::text("A"), t0);
        save.queue(id("b"), TaskPatch::text("B"), t0 + Duration::from_millis(600));
        assert_eq!(save.next_deadline(), Some(t0 + WINDOW));

        let due = save.take_due(t0 + WINDOW);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, id("a"));
        assert_eq!(save.len(), 1);
    }

    #[test]
    fn requeue_keeps_newer_edits_on_top() {
        let t0 = Instant::now();
        let mut save = AutoSave::new(WINDOW);
        save.queue(id("t1"), TaskPatch::text("newer"), t0);
        save.requeue(
            id("t1"),
            TaskPatch {
                text: Some("older".into()),
                details: Some("kept".into()),
                ..Default::default()
            },
            t0,
        );
        let patch = save.pending(&id("t1")).unwrap();
        assert_eq!(patch.text.as_deref(), Some("newer"));
        assert_eq!(patch.details.as_deref(), Some("kept"));
    }

    #[test]
    fn empty_patches_are_ignored_and_discard_drops() {
        let t0 = Instant::now();
        let mut save = AutoSave::new(WINDOW);
        save.queue(id("t1"), TaskPatch::default(), t0);
        assert!(save.is_empty());

        save.queue(id("t1"), TaskPatch::completed(true), t0);
        save.discard(&id("t1"));
        assert!(save.take_all().is_empty());
    }
}
