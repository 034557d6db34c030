use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::model::forest::{Forest, TaskNode};
use crate::model::task::{Assignment, Task};
use crate::ops::agenda::{AgendaDay, AgendaEntry};
use crate::util::datetime::format_local_in;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personnel: Vec<Assignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct FlatTaskJson {
    pub depth: usize,
    #[serde(flatten)]
    pub task: TaskJson,
}

#[derive(Serialize)]
pub struct TaskDetailJson {
    #[serde(flatten)]
    pub task: TaskJson,
    pub ancestors: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct AgendaJson {
    pub overdue: Vec<AgendaEntryJson>,
    pub days: Vec<AgendaDayJson>,
}

#[derive(Serialize)]
pub struct AgendaDayJson {
    pub day: String,
    pub tasks: Vec<AgendaEntryJson>,
}

#[derive(Serialize)]
pub struct AgendaEntryJson {
    pub id: String,
    pub text: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub task_id: String,
    pub text: String,
    pub field: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// One task without its children
pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.to_string(),
        text: task.text.clone(),
        completed: task.completed,
        parent_id: task.parent_id.as_ref().map(|p| p.to_string()),
        due_date: task.due_date,
        details: task.details.clone(),
        images: task.images.clone(),
        personnel: task.personnel.clone(),
        children: Vec::new(),
    }
}

/// A task with its whole subtree nested under `children`
pub fn node_to_json(node: &TaskNode) -> TaskJson {
    TaskJson {
        children: node.children.iter().map(|c| node_to_json(c)).collect(),
        ..task_to_json(&node.task)
    }
}

pub fn forest_to_json(forest: &Forest) -> Vec<TaskJson> {
    forest.roots().iter().map(|r| node_to_json(r)).collect()
}

pub fn flat_to_json(forest: &Forest) -> Vec<FlatTaskJson> {
    forest
        .walk()
        .into_iter()
        .map(|(task, depth)| FlatTaskJson {
            depth,
            task: task_to_json(task),
        })
        .collect()
}

pub fn agenda_to_json(days: &[AgendaDay]) -> Vec<AgendaDayJson> {
    days.iter()
        .map(|d| AgendaDayJson {
            day: d.day.format("%Y-%m-%d").to_string(),
            tasks: d.entries.iter().map(agenda_entry_to_json).collect(),
        })
        .collect()
}

pub fn agenda_entry_to_json(entry: &AgendaEntry) -> AgendaEntryJson {
    AgendaEntryJson {
        id: entry.id.to_string(),
        text: entry.text.clone(),
        due_date: entry.due,
        completed: entry.completed,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(task: &Task) -> char {
    if task.completed { 'x' } else { ' ' }
}

/// `[ ] 3 Sign off  @ 2026-03-01T09:00`
pub fn format_task_line<Tz: TimeZone>(task: &Task, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let due = task
        .due_date
        .map(|d| format!("  @ {}", format_local_in(&d, tz)))
        .unwrap_or_default();
    format!("[{}] {} {}{}", check_char(task), task.id, task.text, due)
}

/// Format a task with its children, indented two spaces per level
pub fn format_task_tree<Tz: TimeZone>(node: &TaskNode, indent: usize, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![format!("{}{}", "  ".repeat(indent), format_task_line(&node.task, tz))];
    for child in &node.children {
        lines.extend(format_task_tree(child, indent + 1, tz));
    }
    lines
}

pub fn format_forest<Tz: TimeZone>(forest: &Forest, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    forest
        .roots()
        .iter()
        .flat_map(|r| format_task_tree(r, 0, tz))
        .collect()
}

/// Pre-order, one task per line, prefixed with its depth
pub fn format_flat<Tz: TimeZone>(forest: &Forest, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    forest
        .walk()
        .into_iter()
        .map(|(task, depth)| format!("{} {}", depth, format_task_line(task, tz)))
        .collect()
}

/// Detailed task view with the parent chain on top
pub fn format_task_detail<Tz: TimeZone>(ancestors: &[&Task], node: &TaskNode, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = Vec::new();
    let task = &node.task;

    if !ancestors.is_empty() {
        let path: Vec<String> = ancestors
            .iter()
            .map(|a| format!("{} {}", a.id, a.text))
            .collect();
        lines.push(format!("in: {}", path.join(" > ")));
    }
    lines.push(format!("[{}] {} {}", check_char(task), task.id, task.text));

    if let Some(due) = &task.due_date {
        lines.push(format!("due: {}", format_local_in(due, tz)));
    }
    if let Some(details) = &task.details {
        lines.push("details:".to_string());
        for line in details.lines() {
            lines.push(format!("  {}", line));
        }
    }
    for image in &task.images {
        lines.push(format!("image: {}", image));
    }
    for person in &task.personnel {
        if person.role.is_empty() {
            lines.push(format!("person: {}", person.name));
        } else {
            lines.push(format!("person: {} ({})", person.name, person.role));
        }
    }

    if !node.children.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for child in &node.children {
            lines.extend(format_task_tree(child, 1, tz));
        }
    }
    lines
}

pub fn format_agenda<Tz: TimeZone>(days: &[AgendaDay], tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = Vec::new();
    for (i, day) in days.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("== {} ==", day.day.format("%a %Y-%m-%d")));
        for e in &day.entries {
            let time = e.due.with_timezone(tz).format("%H:%M");
            let mark = if e.completed { 'x' } else { ' ' };
            lines.push(format!("  {} [{}] {} {}", time, mark, e.id, e.text));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskPatch;
    use crate::ops::agenda::agenda_in;
    use crate::ops::task_ops::{self, update_fields};
    use crate::ops::test_helpers::{forest_of, row};
    use crate::ops::tree::build_forest;
    use chrono::NaiveDate;

    fn sample() -> Forest {
        let mut rows = vec![
            row("1", None, "Brief crew"),
            row("2", Some("1"), "Review logs"),
            row("3", Some("2"), "Sign off"),
            row("4", None, "Refit"),
        ];
        rows[2].task.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        rows[3].task.completed = true;
        build_forest(&rows).unwrap()
    }

    #[test]
    fn tree_listing() {
        insta::assert_snapshot!(format_forest(&sample(), &Utc).join("\n"), @r"
        [ ] 1 Brief crew
          [ ] 2 Review logs
            [ ] 3 Sign off  @ 2026-03-01T09:00
        [x] 4 Refit
        ");
    }

    #[test]
    fn flat_listing() {
        insta::assert_snapshot!(format_flat(&sample(), &Utc).join("\n"), @r"
        0 [ ] 1 Brief crew
        1 [ ] 2 Review logs
        2 [ ] 3 Sign off  @ 2026-03-01T09:00
        0 [x] 4 Refit
        ");
    }

    #[test]
    fn detail_shows_path_and_dossier() {
        let patch = TaskPatch {
            details: Some("Check both\nlogbooks".into()),
            images: Some(vec!["https://img.example/bridge.png".into()]),
            personnel: Some(vec![Assignment::parse(1, "Vale:engineer"), Assignment::parse(2, "Okoro")]),
            ..Default::default()
        };
        let forest = update_fields(&sample(), &"2".into(), &patch).unwrap();
        let node = task_ops::find(&forest, &"2".into()).unwrap();
        let chain = task_ops::ancestors(&forest, &"2".into()).unwrap();

        insta::assert_snapshot!(format_task_detail(&chain, node, &Utc).join("\n"), @r"
        in: 1 Brief crew
        [ ] 2 Review logs
        details:
          Check both
          logbooks
        image: https://img.example/bridge.png
        person: Vale (engineer)
        person: Okoro

        subtasks:
          [ ] 3 Sign off  @ 2026-03-01T09:00
        ");
    }

    #[test]
    fn agenda_groups_by_day() {
        let from = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let days = agenda_in(&sample(), from, 7, &Utc);
        insta::assert_snapshot!(format_agenda(&days, &Utc).join("\n"), @r"
        == Sun 2026-03-01 ==
          09:00 [ ] 3 Sign off
        ");
    }

    #[test]
    fn json_nests_children_and_skips_empty_fields() {
        let json = serde_json::to_value(forest_to_json(&forest_of(&[("a", None), ("b", Some("a"))]))).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {
                    "id": "a",
                    "text": "a",
                    "completed": false,
                    "children": [
                        { "id": "b", "text": "b", "completed": false, "parent_id": "a" }
                    ]
                }
            ])
        );
    }

    #[test]
    fn flat_json_carries_depth() {
        let flat = flat_to_json(&forest_of(&[("a", None), ("b", Some("a"))]));
        let json = serde_json::to_value(&flat).unwrap();
        assert_eq!(json[1]["depth"], 1);
        assert_eq!(json[1]["parent_id"], "a");
    }
}
