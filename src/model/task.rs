use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque task identifier.
///
/// Stores accept either JSON strings or integers for ids; both are kept in
/// their string form so that `7` and `"7"` name the same task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl From<u64> for TaskId {
    fn from(n: u64) -> Self {
        TaskId(n.to_string())
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Numeric ids sort first, by value, with the text breaking ties between
/// spellings such as `01` and `1`. Every other id follows, lexically.
impl Ord for TaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => TaskId(s),
            Raw::Number(n) => TaskId(n.to_string()),
        })
    }
}

/// A crew member attached to a task's dossier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl Assignment {
    /// Parse `NAME:ROLE` (role optional) into an assignment with the given id
    pub fn parse(id: u64, input: &str) -> Self {
        let (name, role) = input.split_once(':').unwrap_or((input, ""));
        Assignment {
            id,
            name: name.trim().to_string(),
            role: role.trim().to_string(),
        }
    }
}

/// One actionable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Parent task, `None` for roots
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Local wall-clock due time, normalized to UTC
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub personnel: Vec<Assignment>,
}

impl Task {
    /// Create an open task with no dossier content
    pub fn new(id: impl Into<TaskId>, text: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            parent_id: None,
            text: text.into(),
            completed: false,
            due_date: None,
            details: None,
            images: Vec::new(),
            personnel: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    /// Next free assignment id within this task's personnel list
    pub fn next_assignment_id(&self) -> u64 {
        self.personnel.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }
}

/// A task as stored remotely: the task fields plus ownership and creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub task: Task,
}

impl TaskRow {
    pub fn id(&self) -> &TaskId {
        &self.task.id
    }

    pub fn parent_id(&self) -> Option<&TaskId> {
        self.task.parent_id.as_ref()
    }
}

/// Payload for creating a task in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub parent_id: Option<TaskId>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn root(text: impl Into<String>) -> Self {
        NewTask {
            text: text.into(),
            parent_id: None,
            due_date: None,
        }
    }

    pub fn child(text: impl Into<String>, parent: impl Into<TaskId>) -> Self {
        NewTask {
            text: text.into(),
            parent_id: Some(parent.into()),
            due_date: None,
        }
    }
}

/// A partial update. `None` leaves a field untouched.
///
/// `due_date` is doubly optional: `Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub details: Option<String>,
    pub personnel: Option<Vec<Assignment>>,
    pub images: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        TaskPatch {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn details(details: impl Into<String>) -> Self {
        TaskPatch {
            details: Some(details.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Write every present field into `task`
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(details) = &self.details {
            task.details = Some(details.clone());
        }
        if let Some(personnel) = &self.personnel {
            task.personnel = personnel.clone();
        }
        if let Some(images) = &self.images {
            task.images = images.clone();
        }
    }

    /// Fold a later patch into this one; fields present in `later` win.
    pub fn merge(&mut self, later: TaskPatch) {
        if later.text.is_some() {
            self.text = later.text;
        }
        if later.completed.is_some() {
            self.completed = later.completed;
        }
        if later.due_date.is_some() {
            self.due_date = later.due_date;
        }
        if later.details.is_some() {
            self.details = later.details;
        }
        if later.personnel.is_some() {
            self.personnel = later.personnel;
        }
        if later.images.is_some() {
            self.images = later.images;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_accepts_strings_and_integers() {
        let ids: Vec<TaskId> = serde_json::from_str(r#"["t1", 42]"#).unwrap();
        assert_eq!(ids[0], "t1");
        assert_eq!(ids[1], "42");
        assert_eq!(serde_json::to_string(&ids[1]).unwrap(), r#""42""#);
    }

    #[test]
    fn numeric_ids_order_numerically() {
        assert!(TaskId::from(9) < TaskId::from(10));
        assert!(TaskId::from("a") < TaskId::from("b"));
    }

    #[test]
    fn mixed_ids_have_a_total_order() {
        let two = TaskId::from("2");
        let ten = TaskId::from("10");
        let odd = TaskId::from("1a");
        assert!(two < ten);
        assert!(ten < odd);
        assert!(two < odd);

        // same value, different spelling: ordered, and never Equal
        assert_eq!(TaskId::from("01").cmp(&TaskId::from("1")), Ordering::Less);
        assert_eq!(TaskId::from("7").cmp(&TaskId::from("7")), Ordering::Equal);

        let mut ids: Vec<TaskId> = ["b", "10", "1a", "2", "01", "1", "a"].into_iter().map(TaskId::from).collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(TaskId::as_str).collect();
        assert_eq!(sorted, vec!["01", "1", "2", "10", "1a", "a", "b"]);
    }

    #[test]
    fn row_deserializes_with_defaults() {
        let row: TaskRow = serde_json::from_str(
            r#"{"id": 3, "owner_id": "crew", "created_at": "2026-01-02T03:04:05Z", "text": "Brief crew"}"#,
        )
        .unwrap();
        assert_eq!(row.task.id, "3");
        assert!(row.task.parent_id.is_none());
        assert!(!row.task.completed);
        assert!(row.task.images.is_empty());
    }

    #[test]
    fn patch_merge_later_fields_win() {
        let mut patch = TaskPatch::details("draft");
        patch.merge(TaskPatch {
            details: Some("final".into()),
            images: Some(vec!["https://img/1".into()]),
            ..Default::default()
        });
        assert_eq!(patch.details.as_deref(), Some("final"));
        assert_eq!(patch.images.as_ref().map(Vec::len), Some(1));
        assert!(patch.text.is_none());
    }

    #[test]
    fn patch_can_clear_due_date() {
        let mut task = Task::new("t1", "Brief crew");
        task.due_date = Some(Utc::now());
        let patch = TaskPatch {
            due_date: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut task);
        assert!(task.due_date.is_none());
    }

    #[test]
    fn assignment_parse_splits_role() {
        let a = Assignment::parse(1, "Picard : Captain");
        assert_eq!(a.name, "Picard");
        assert_eq!(a.role, "Captain");
        assert_eq!(Assignment::parse(2, "Data").role, "");
    }
}
