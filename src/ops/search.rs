use std::ops::Range;

use regex::Regex;

use crate::model::forest::Forest;
use crate::model::task::TaskId;

/// Which field of a task matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Text,
    Details,
    Personnel,
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchField::Text => write!(f, "text"),
            MatchField::Details => write!(f, "details"),
            MatchField::Personnel => write!(f, "personnel"),
        }
    }
}

/// A search hit for a task field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub task_id: TaskId,
    pub field: MatchField,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search every task in forest order. One hit per matching field.
pub fn search_tasks(forest: &Forest, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for (task, _) in forest.walk() {
        let mut push = |field: MatchField, text: &str| {
            let spans = find_matches(re, text);
            if !spans.is_empty() {
                hits.push(SearchHit {
                    task_id: task.id.clone(),
                    field,
                    spans,
                });
            }
        };
        push(MatchField::Text, &task.text);
        if let Some(details) = &task.details {
            push(MatchField::Details, details);
        }
        let crew: Vec<String> = task
            .personnel
            .iter()
            .map(|p| format!("{} {}", p.name, p.role))
            .collect();
        if !crew.is_empty() {
            push(MatchField::Personnel, &crew.join("\n"));
        }
    }
    hits
}
