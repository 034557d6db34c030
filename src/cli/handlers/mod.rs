mod init;
pub use init::cmd_init;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use regex::Regex;

/// Directory override set by the -C flag. Fixed for the life of the process.
static DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

use crate::board::Board;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::file_store::FileStore;
use crate::logging;
use crate::model::config::PaddConfig;
use crate::model::task::{Assignment, NewTask, TaskId, TaskPatch};
use crate::ops::{agenda, search, task_ops};
use crate::util::datetime::parse_local;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    if let Some(ref dir) = cli.dir {
        let abs = std::fs::canonicalize(dir).map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        pin_dir(&DIR_OVERRIDE, abs)?;
    }

    match cli.command {
        Commands::Init(args) => cmd_init(args),

        // Read commands
        Commands::List(args) => cmd_list(args, json),
        Commands::Show(args) => cmd_show(args, json),
        Commands::Agenda(args) => cmd_agenda(args, json),
        Commands::Search(args) => cmd_search(args, json),
        Commands::Watch => cmd_watch(json),

        // Write commands
        Commands::Add(args) => cmd_add(args, json),
        Commands::Toggle(args) => cmd_toggle(args),
        Commands::Edit(args) => cmd_edit(args),
        Commands::Rm(args) => cmd_rm(args),
        Commands::Mv(args) => cmd_mv(args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Record the -C directory. A second dispatch in the same process may only
/// repeat the same directory.
fn pin_dir(cell: &OnceLock<PathBuf>, dir: PathBuf) -> Result<(), String> {
    let pinned = cell.get_or_init(|| dir.clone());
    if *pinned != dir {
        return Err(format!("-C already set to '{}' in this process", pinned.display()));
    }
    Ok(())
}

/// Where commands start looking for `.padd/`
fn start_dir() -> std::io::Result<PathBuf> {
    match DIR_OVERRIDE.get() {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir(),
    }
}

fn load_config_cwd() -> Result<(PathBuf, PaddConfig), Box<dyn std::error::Error>> {
    let start = start_dir()?;
    let data_dir = config_io::discover_data_dir(&start)?;
    let config = config_io::load_config(&data_dir)?;
    logging::init(&config.log.level);
    Ok((data_dir, config))
}

fn open_board() -> Result<Board<FileStore>, Box<dyn std::error::Error>> {
    let (data_dir, config) = load_config_cwd()?;
    let store = FileStore::open(&data_dir, &config_io::store_path(&data_dir, &config));
    let debounce = Duration::from_millis(config.autosave.debounce_ms);
    Ok(Board::open(store, config.profile.owner, debounce)?)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn not_found(id: &TaskId) -> Box<dyn std::error::Error> {
    format!("task not found: {}", id).into()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, json: bool) -> CmdResult {
    let board = open_board()?;
    let forest = board.forest();

    if json {
        if args.flat {
            println!("{}", serde_json::to_string_pretty(&flat_to_json(forest))?);
        } else {
            println!("{}", serde_json::to_string_pretty(&forest_to_json(forest))?);
        }
    } else if forest.is_empty() {
        println!("no tasks");
    } else if args.flat {
        print_lines(&format_flat(forest, &Local));
    } else {
        print_lines(&format_forest(forest, &Local));
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, json: bool) -> CmdResult {
    let board = open_board()?;
    let id = TaskId::from(args.id.as_str());
    let forest = board.forest();
    let node = task_ops::find(forest, &id).ok_or_else(|| not_found(&id))?;
    let chain = task_ops::ancestors(forest, &id).unwrap_or_default();

    if json {
        let detail = TaskDetailJson {
            task: node_to_json(node),
            ancestors: chain.iter().map(|t| task_to_json(t)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_lines(&format_task_detail(&chain, node, &Local));
    }
    Ok(())
}

fn cmd_agenda(args: AgendaArgs, json: bool) -> CmdResult {
    let board = open_board()?;
    let from = match &args.from {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{}': expected YYYY-MM-DD", s))?,
        None => Local::now().date_naive(),
    };
    let days = agenda::agenda_in(board.forest(), from, args.days, &Local);
    // overdue only when looking from today
    let late = if args.from.is_none() {
        agenda::overdue(board.forest(), Utc::now())
    } else {
        Vec::new()
    };

    if json {
        let out = AgendaJson {
            overdue: late.iter().map(agenda_entry_to_json).collect(),
            days: agenda_to_json(&days),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !late.is_empty() {
        println!("== overdue ==");
        for e in &late {
            println!("  {} {}", e.id, e.text);
        }
        if !days.is_empty() {
            println!();
        }
    }
    if days.is_empty() && late.is_empty() {
        println!("nothing due");
    }
    print_lines(&format_agenda(&days, &Local));
    Ok(())
}

fn cmd_search(args: SearchArgs, json: bool) -> CmdResult {
    let board = open_board()?;
    let re = Regex::new(&args.pattern)?;
    let hits = search::search_tasks(board.forest(), &re);

    if json {
        let out: Vec<SearchHitJson> = hits
            .iter()
            .filter_map(|hit| {
                task_ops::find(board.forest(), &hit.task_id).map(|node| SearchHitJson {
                    task_id: hit.task_id.to_string(),
                    text: node.task.text.clone(),
                    field: hit.field.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    // One line per task even when several fields match
    let mut seen = HashSet::new();
    for hit in &hits {
        if seen.insert(&hit.task_id)
            && let Some(node) = task_ops::find(board.forest(), &hit.task_id)
        {
            println!("{}", format_task_line(&node.task, &Local));
        }
    }
    Ok(())
}

fn cmd_watch(json: bool) -> CmdResult {
    let mut board = open_board()?;
    board.subscribe()?;

    let render = |board: &Board<FileStore>| -> CmdResult {
        if json {
            println!("{}", serde_json::to_string(&forest_to_json(board.forest()))?);
        } else {
            println!("-- {} --", Local::now().format("%H:%M:%S"));
            print_lines(&format_forest(board.forest(), &Local));
        }
        Ok(())
    };

    render(&board)?;
    loop {
        match board.wait_for_change(Duration::from_secs(60)) {
            Ok(true) => render(&board)?,
            Ok(false) => {}
            // The file may be mid-rewrite by another process; the next event retries
            Err(e) => tracing::warn!(error = %e, "refresh after change failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, json: bool) -> CmdResult {
    let mut board = open_board()?;
    let task = NewTask {
        text: args.text,
        parent_id: args.parent.as_deref().map(TaskId::from),
        due_date: args.due.as_deref().map(parse_local).transpose()?,
    };
    let id = board.add_task(task)?;

    if json {
        let node = task_ops::find(board.forest(), &id).ok_or_else(|| not_found(&id))?;
        println!("{}", serde_json::to_string_pretty(&task_to_json(&node.task))?);
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_toggle(args: IdArg) -> CmdResult {
    let mut board = open_board()?;
    board.toggle(&TaskId::from(args.id.as_str()))?;
    Ok(())
}

fn cmd_edit(args: EditArgs) -> CmdResult {
    let mut board = open_board()?;
    let id = TaskId::from(args.id.as_str());
    let current = task_ops::find(board.forest(), &id)
        .ok_or_else(|| not_found(&id))?
        .task
        .clone();

    let mut patch = TaskPatch {
        text: args.text,
        details: args.details,
        ..Default::default()
    };
    if args.clear_due {
        patch.due_date = Some(None);
    } else if let Some(due) = &args.due {
        patch.due_date = Some(Some(parse_local(due)?));
    }
    if !args.images.is_empty() {
        let mut images = current.images.clone();
        images.extend(args.images);
        patch.images = Some(images);
    }
    if !args.personnel.is_empty() {
        let mut personnel = current.personnel.clone();
        let mut next_id = current.next_assignment_id();
        for entry in &args.personnel {
            personnel.push(Assignment::parse(next_id, entry));
            next_id += 1;
        }
        patch.personnel = Some(personnel);
    }

    if patch.is_empty() {
        return Err("nothing to change (see `padd edit --help`)".into());
    }
    board.update(&id, &patch)?;
    Ok(())
}

fn cmd_rm(args: IdArg) -> CmdResult {
    let mut board = open_board()?;
    board.delete(&TaskId::from(args.id.as_str()))?;
    Ok(())
}

fn cmd_mv(args: MvArgs) -> CmdResult {
    let mut board = open_board()?;
    let id = TaskId::from(args.id.as_str());
    let parent = if args.root {
        None
    } else {
        args.under.as_deref().map(TaskId::from)
    };
    board.reparent(&id, parent.as_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_override_may_only_be_repeated() {
        let cell = OnceLock::new();
        pin_dir(&cell, PathBuf::from("/ship/deck1")).unwrap();
        pin_dir(&cell, PathBuf::from("/ship/deck1")).unwrap();
        let err = pin_dir(&cell, PathBuf::from("/ship/deck2")).unwrap_err();
        assert!(err.contains("/ship/deck1"));
        assert_eq!(cell.get(), Some(&PathBuf::from("/ship/deck1")));
    }
}
