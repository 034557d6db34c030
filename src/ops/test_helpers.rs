//! Fixtures shared by the ops unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::forest::{Forest, TaskNode};
use crate::model::task::{Task, TaskRow};
use crate::ops::tree::build_forest;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn row(id: &str, parent: Option<&str>, text: &str) -> TaskRow {
    let mut task = Task::new(id, text);
    task.parent_id = parent.map(Into::into);
    TaskRow {
        owner_id: "crew".into(),
        created_at: epoch(),
        task,
    }
}

/// Build a forest from `(id, parent)` pairs; text mirrors the id
pub fn forest_of(pairs: &[(&str, Option<&str>)]) -> Forest {
    let rows: Vec<TaskRow> = pairs.iter().map(|(id, p)| row(id, *p, id)).collect();
    build_forest(&rows).unwrap()
}

/// Compact rendering: `a(b, c(d)), e`
pub fn shape(forest: &Forest) -> String {
    fn node(n: &TaskNode) -> String {
        if n.children.is_empty() {
            n.task.id.to_string()
        } else {
            let kids: Vec<String> = n.children.iter().map(|c| node(c)).collect();
            format!("{}({})", n.task.id, kids.join(", "))
        }
    }
    forest
        .roots()
        .iter()
        .map(|r| node(r))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pre-order `(id, depth)` pairs
pub fn ids(forest: &Forest) -> Vec<(&str, usize)> {
    forest
        .walk()
        .into_iter()
        .map(|(t, d)| (t.id.as_str(), d))
        .collect()
}
