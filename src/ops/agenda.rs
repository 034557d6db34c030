use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::model::forest::Forest;
use crate::model::task::{Task, TaskId};
use crate::util::datetime::local_day_in;

/// A task with a due date, placed on its local day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaEntry {
    pub id: TaskId,
    pub text: String,
    pub due: DateTime<Utc>,
    pub completed: bool,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaDay {
    pub day: NaiveDate,
    pub entries: Vec<AgendaEntry>,
}

impl AgendaEntry {
    fn from_task(task: &Task, due: DateTime<Utc>, depth: usize) -> Self {
        AgendaEntry {
            id: task.id.clone(),
            text: task.text.clone(),
            due,
            completed: task.completed,
            depth,
        }
    }
}

/// Group due tasks by local day for `days` days starting at `from`.
/// Days with nothing due are left out; entries within a day are sorted by due time.
pub fn agenda_in<Tz: TimeZone>(forest: &Forest, from: NaiveDate, days: u64, tz: &Tz) -> Vec<AgendaDay> {
    let Some(until) = from.checked_add_days(Days::new(days)) else {
        return Vec::new();
    };

    let mut result: Vec<AgendaDay> = Vec::new();
    let mut dated: Vec<(NaiveDate, AgendaEntry)> = forest
        .walk()
        .into_iter()
        .filter_map(|(task, depth)| {
            let due = task.due_date?;
            let day = local_day_in(&due, tz);
            (day >= from && day < until).then(|| (day, AgendaEntry::from_task(task, due, depth)))
        })
        .collect();
    // stable: equal instants keep forest order
    dated.sort_by_key(|(_, e)| e.due);

    for (day, entry) in dated {
        match result.iter_mut().find(|d| d.day == day) {
            Some(d) => d.entries.push(entry),
            None => result.push(AgendaDay {
                day,
                entries: vec![entry],
            }),
        }
    }
    result
}

/// Open tasks whose due time has passed, earliest first
pub fn overdue(forest: &Forest, now: DateTime<Utc>) -> Vec<AgendaEntry> {
    let mut late: Vec<AgendaEntry> = forest
        .walk()
        .into_iter()
        .filter(|(task, _)| !task.completed)
        .filter_map(|(task, depth)| {
            let due = task.due_date?;
            (due < now).then(|| AgendaEntry::from_task(task, due, depth))
        })
        .collect();
    late.sort_by_key(|e| e.due);
    late
}
