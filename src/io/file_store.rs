use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::io::lock::StoreLock;
use crate::io::watcher;
use crate::model::task::{NewTask, TaskId, TaskPatch, TaskRow};
use crate::store::{RowTable, StoreError, Subscription, TaskStore};

/// A [`TaskStore`] backed by one JSON file in the data directory.
///
/// Every call re-reads the file under the store lock, so several `padd`
/// processes can share it. Subscriptions watch the file for changes made by
/// any of them.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    path: PathBuf,
}

impl FileStore {
    /// Open the store at `path`. The file is created lazily on first write;
    /// a missing file reads as an empty store.
    pub fn open(data_dir: &Path, path: &Path) -> Self {
        FileStore {
            data_dir: data_dir.to_path_buf(),
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an empty store file, replacing any existing one
    pub fn create_empty(&self) -> Result<(), StoreError> {
        let _lock = StoreLock::acquire_default(&self.data_dir)?;
        self.save(&RowTable::new())
    }

    fn load(&self) -> Result<RowTable, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(RowTable::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RowTable::new()),
            Err(e) => Err(StoreError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, table: &RowTable) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(table)?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes()).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Load, mutate, and save under the lock. Nothing is written when `f` fails.
    fn modify<T>(&self, f: impl FnOnce(&mut RowTable) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _lock = StoreLock::acquire_default(&self.data_dir)?;
        let mut table = self.load()?;
        let out = f(&mut table)?;
        self.save(&table)?;
        Ok(out)
    }
}

impl TaskStore for FileStore {
    fn fetch_all(&self, owner: &str) -> Result<Vec<TaskRow>, StoreError> {
        let _lock = StoreLock::acquire_default(&self.data_dir)?;
        let rows = self.load()?.select(owner);
        tracing::debug!(owner, rows = rows.len(), "fetched rows");
        Ok(rows)
    }

    fn insert(&mut self, owner: &str, task: NewTask) -> Result<TaskRow, StoreError> {
        let row = self.modify(|t| t.insert(owner, task, Utc::now()))?;
        tracing::debug!(id = %row.id(), "inserted row");
        Ok(row)
    }

    fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        self.modify(|t| t.update(id, patch))
    }

    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        let removed = self.modify(|t| t.delete(id))?;
        tracing::debug!(%id, removed, "deleted rows");
        Ok(())
    }

    fn reparent(&mut self, id: &TaskId, parent: Option<&TaskId>) -> Result<(), StoreError> {
        self.modify(|t| t.reparent(id, parent))
    }

    fn subscribe(&mut self, _owner: &str) -> Result<Subscription, StoreError> {
        Ok(watcher::watch_store_file(&self.data_dir, &self.path)?)
    }
}

/// Write to a temp file in the same directory, then rename over `path`
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> FileStore {
        FileStore::open(tmp.path(), &tmp.path().join("tasks.json"))
    }

    fn ids(rows: &[TaskRow]) -> Vec<String> {
        rows.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(store(&tmp).fetch_all("crew").unwrap().is_empty());
    }

    #[test]
    fn rows_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        let parent = s.insert("crew", NewTask::root("Brief crew")).unwrap();
        s.insert("crew", NewTask::child("Review logs", parent.id().as_str())).unwrap();

        let reopened = store(&tmp);
        let rows = reopened.fetch_all("crew").unwrap();
        assert_eq!(ids(&rows), vec!["1", "2"]);
        assert_eq!(rows[1].parent_id(), Some(parent.id()));
        assert!(tmp.path().join(".lock").exists());
    }

    #[test]
    fn file_without_next_id_still_hands_out_fresh_ids() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        fs::write(
            s.path(),
            r#"{"rows": [{"id": 1, "owner_id": "crew", "created_at": "2026-01-01T00:00:00Z", "text": "Brief crew"}]}"#,
        )
        .unwrap();

        let row = s.insert("crew", NewTask::root("Restock")).unwrap();
        assert_eq!(row.id(), &TaskId::from("2"));
        assert_eq!(ids(&s.fetch_all("crew").unwrap()), vec!["1", "2"]);

        let board = crate::board::Board::open(store(&tmp), "crew", std::time::Duration::ZERO).unwrap();
        assert_eq!(board.forest().len(), 2);
    }

    #[test]
    fn fetch_puts_dated_rows_first() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.insert("crew", NewTask::root("undated")).unwrap();
        let mut dated = NewTask::root("dated");
        dated.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        s.insert("crew", dated).unwrap();

        assert_eq!(ids(&s.fetch_all("crew").unwrap()), vec!["2", "1"]);
    }

    #[test]
    fn delete_cascades_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.insert("crew", NewTask::root("a")).unwrap();
        s.insert("crew", NewTask::child("b", "1")).unwrap();
        s.insert("crew", NewTask::child("c", "2")).unwrap();
        s.insert("crew", NewTask::root("d")).unwrap();

        s.delete(&TaskId::from("1")).unwrap();
        assert_eq!(ids(&store(&tmp).fetch_all("crew").unwrap()), vec!["4"]);
    }

    #[test]
    fn rejected_reparent_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.insert("crew", NewTask::root("a")).unwrap();
        s.insert("crew", NewTask::child("b", "1")).unwrap();
        let before = fs::read_to_string(s.path()).unwrap();

        let err = s.reparent(&TaskId::from("1"), Some(&TaskId::from("2")));
        assert!(matches!(err, Err(StoreError::Rejected(_))));
        assert_eq!(fs::read_to_string(s.path()).unwrap(), before);
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        fs::write(s.path(), "{ not json").unwrap();
        assert!(matches!(s.fetch_all("crew"), Err(StoreError::Json(_))));
    }

    #[test]
    fn create_empty_writes_a_loadable_file() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        s.create_empty().unwrap();
        assert!(s.path().exists());
        assert!(s.fetch_all("crew").unwrap().is_empty());
    }
}
