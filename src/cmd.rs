//! Command implementations for the CLI interface.
//!
//! Everything user-facing lives here: input validation, natural-language
//! date parsing, relative timestamps, and the sentences an activity entry
//! renders as. The core only ever sees structured data.

use std::io::{self, Write};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::activity::{FeedEntry, PLACEHOLDER};
use crate::board::Board;
use crate::cli::Cli;
use crate::fields::{format_category, EventType, Status, CATEGORIES};
use crate::store::{FileBackend, StorageBackend};
use crate::task::{clean_field, ActivityEntry, Task, TaskDraft, TaskPatch};
use crate::tui::run::run_board_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task to the board.
    Add {
        /// Task title (required, rejected if blank).
        title: String,
        /// Optional longer details.
        #[arg(long)]
        details: Option<String>,
        /// Start date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        start: Option<String>,
        /// End date, same formats as --start.
        #[arg(long)]
        end: Option<String>,
        /// Owning department or area.
        #[arg(long)]
        department: Option<String>,
        /// Category id: bug | feature | design | documentation.
        #[arg(long)]
        category: Option<String>,
        /// Starting column.
        #[arg(long, value_enum, default_value_t = Status::Backlog)]
        status: Status,
        /// Free-text note attached to the creation entry.
        #[arg(long)]
        comment: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Filter by column.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by category id.
        #[arg(long)]
        category: Option<String>,
    },

    /// View a single task and its history.
    View {
        /// Task id (a unique prefix is enough).
        id: String,
    },

    /// Update fields on a task. Only genuine changes end up in the history.
    Edit {
        /// Task id (a unique prefix is enough).
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New details; pass an empty string to clear.
        #[arg(long)]
        details: Option<String>,
        /// New start date.
        #[arg(long)]
        start: Option<String>,
        /// New end date.
        #[arg(long)]
        end: Option<String>,
        /// New department; pass an empty string to clear.
        #[arg(long)]
        department: Option<String>,
        /// New category id; pass an empty string to clear.
        #[arg(long)]
        category: Option<String>,
        /// Target column.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Clear the start date.
        #[arg(long)]
        clear_start: bool,
        /// Clear the end date.
        #[arg(long)]
        clear_end: bool,
        /// Free-text note attached to the update entry.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Move a task to another column.
    Move {
        /// Task id (a unique prefix is enough).
        id: String,
        /// Target column.
        #[arg(value_enum)]
        status: Status,
        /// Free-text note attached to the move entry.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Delete a task and its entire history.
    Delete {
        /// Task id (a unique prefix is enough).
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Show one task's activity log.
    Log {
        /// Task id (a unique prefix is enough).
        id: String,
    },

    /// Show the global activity feed across all tasks.
    Feed {
        /// Limit number of entries printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the fixed board columns.
    Columns,

    /// List the fixed task categories.
    Categories,

    /// Launch the interactive board interface.
    Board,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the terminal board interface.
pub fn cmd_board(board: Board<FileBackend>) {
    if let Err(e) = run_board_tui(board) {
        eprintln!("Board UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task to the board.
pub fn cmd_add<B: StorageBackend>(
    board: &mut Board<B>,
    title: String,
    details: Option<String>,
    start: Option<String>,
    end: Option<String>,
    department: Option<String>,
    category: Option<String>,
    status: Status,
    comment: Option<String>,
) {
    let title = match clean_field(&title) {
        Some(t) => t,
        None => {
            eprintln!("Title is required.");
            std::process::exit(1);
        }
    };
    let draft = TaskDraft {
        id: None,
        title,
        details: details.as_deref().and_then(clean_field),
        start_date: start.map(|s| parse_date_or_exit(&s)),
        end_date: end.map(|s| parse_date_or_exit(&s)),
        department: department.as_deref().and_then(clean_field),
        category: category.as_deref().and_then(clean_field),
        status,
    };
    let task = board.create(draft, comment);
    println!("Added task {} to {}", short_id(&task.id), task.status.title());
}

/// List tasks with optional filtering.
pub fn cmd_list<B: StorageBackend>(board: &Board<B>, status: Option<Status>, category: Option<String>) {
    let tasks = match status {
        Some(s) => board.by_status(s),
        None => board.tasks(),
    };
    let tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|t| {
            category
                .as_deref()
                .map_or(true, |c| t.category.as_deref() == Some(c))
        })
        .collect();
    print_table(&tasks);
}

/// View a single task and its history.
pub fn cmd_view<B: StorageBackend>(board: &Board<B>, id: &str) {
    let task = resolve_or_exit(board, id);
    let today = Local::now().date_naive();

    println!("Task {}: {}", short_id(&task.id), task.title);
    println!("  Column:      {}", task.status.title());
    println!("  Category:    {}", format_category(task.category.as_deref()));
    println!("  Department:  {}", task.department.as_deref().unwrap_or(PLACEHOLDER));
    println!("  Start:       {}", format_date(task.start_date));
    println!("  End:         {}", format_date_relative(task.end_date, today));
    println!("  Details:     {}", task.details.as_deref().unwrap_or(PLACEHOLDER));
    println!("  Created:     {}", format_relative(task.created_at));
    println!("  Updated:     {}", format_relative(task.updated_at));

    let log = board.log(&task.id).unwrap_or_default();
    if !log.is_empty() {
        println!("  History:");
        for entry in &log {
            println!("    {:>12}  {}", format_relative(entry.timestamp), describe_entry(entry));
        }
    }
}

/// Update fields on a task.
pub fn cmd_edit<B: StorageBackend>(
    board: &mut Board<B>,
    id: &str,
    title: Option<String>,
    details: Option<String>,
    start: Option<String>,
    end: Option<String>,
    department: Option<String>,
    category: Option<String>,
    status: Option<Status>,
    clear_start: bool,
    clear_end: bool,
    comment: Option<String>,
) {
    let task = resolve_or_exit(board, id);
    let title = match title {
        Some(t) => match clean_field(&t) {
            Some(t) => Some(t),
            None => {
                eprintln!("Title cannot be blank.");
                std::process::exit(1);
            }
        },
        None => None,
    };
    let start_date = if clear_start {
        Some(None)
    } else {
        start.map(|s| Some(parse_date_or_exit(&s)))
    };
    let end_date = if clear_end {
        Some(None)
    } else {
        end.map(|s| Some(parse_date_or_exit(&s)))
    };

    let patch = TaskPatch {
        title,
        details: details.map(|v| clean_field(&v)),
        start_date,
        end_date,
        department: department.map(|v| clean_field(&v)),
        category: category.map(|v| clean_field(&v)),
        status,
        activity: None,
    };
    if patch.is_empty() {
        eprintln!("Nothing to update. Pass at least one field flag.");
        std::process::exit(1);
    }

    let before = task.activity.len();
    match board.edit(&task.id, patch, comment) {
        Some(updated) if updated.activity.len() > before => {
            let recorded = updated.activity[0].details.len();
            println!("Updated task {} ({} change{} recorded)", short_id(&updated.id), recorded, plural(recorded));
        }
        Some(updated) => println!("Task {} unchanged, nothing recorded", short_id(&updated.id)),
        None => eprintln!("Task {id} not found"),
    }
}

/// Move a task to another column.
pub fn cmd_move<B: StorageBackend>(board: &mut Board<B>, id: &str, status: Status, comment: Option<String>) {
    let task = resolve_or_exit(board, id);
    if task.status == status {
        println!("Task {} is already in {}", short_id(&task.id), status.title());
        return;
    }
    match board.move_to(&task.id, status, comment) {
        Some(moved) => println!("Moved task {} to {}", short_id(&moved.id), moved.status.title()),
        None => eprintln!("Task {id} not found"),
    }
}

/// Delete a task after an explicit confirmation.
pub fn cmd_delete<B: StorageBackend>(board: &mut Board<B>, id: &str, yes: bool) {
    let task = resolve_or_exit(board, id);
    if !yes && !confirm(&format!("Delete task '{}' and its history? This cannot be undone.", task.title)) {
        println!("Aborted.");
        return;
    }
    if board.remove(&task.id) {
        println!("Deleted task {}", short_id(&task.id));
    } else {
        eprintln!("Failed to save the board after deleting {}", short_id(&task.id));
        std::process::exit(1);
    }
}

/// Show one task's activity log.
pub fn cmd_log<B: StorageBackend>(board: &Board<B>, id: &str) {
    let task = resolve_or_exit(board, id);
    let log = board.log(&task.id).unwrap_or_default();
    if log.is_empty() {
        println!("No activity for task {}", short_id(&task.id));
        return;
    }
    println!("History of '{}':", task.title);
    for entry in &log {
        print_entry(&entry.task_title, entry);
    }
}

/// Show the global activity feed.
pub fn cmd_feed<B: StorageBackend>(board: &Board<B>, limit: Option<usize>) {
    let feed: Vec<FeedEntry> = board.feed();
    if feed.is_empty() {
        println!("No activity yet.");
        return;
    }
    let shown = limit.unwrap_or(feed.len());
    for item in feed.iter().take(shown) {
        print_entry(&item.task_title, &item.entry);
    }
    if feed.len() > shown {
        println!("... {} older entries (raise --limit to see them)", feed.len() - shown);
    }
}

/// List the fixed board columns.
pub fn cmd_columns() {
    println!("{:<12} {}", "ID", "Title");
    for status in Status::ALL {
        println!("{:<12} {}", status.id(), status.title());
    }
}

/// List the fixed task categories.
pub fn cmd_categories() {
    println!("{:<15} {:<15} {}", "ID", "Name", "Class");
    for cat in CATEGORIES {
        println!("{:<15} {:<15} {}", cat.id, cat.name, cat.class);
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kanban", &mut io::stdout());
}

/// Look a task up by id or unique id prefix, or exit with a message.
fn resolve_or_exit<B: StorageBackend>(board: &Board<B>, id: &str) -> Task {
    if let Some(task) = board.find(id) {
        return task;
    }
    let mut matches: Vec<Task> = board.tasks().into_iter().filter(|t| t.id.starts_with(id)).collect();
    match matches.len() {
        1 => matches.remove(0),
        0 => {
            eprintln!("Task {id} not found");
            std::process::exit(1);
        }
        n => {
            eprintln!("Id prefix '{id}' matches {n} tasks; use a longer prefix.");
            std::process::exit(1);
        }
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[Task]) {
    println!(
        "{:<9} {:<20} {:<15} {:<12} {:<14} {}",
        "ID", "Column", "Category", "End", "Department", "Title"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        println!(
            "{:<9} {:<20} {:<15} {:<12} {:<14} {}",
            short_id(&t.id),
            truncate(t.status.title(), 20),
            format_category(t.category.as_deref()),
            format_date_relative(t.end_date, today),
            truncate(t.department.as_deref().unwrap_or(PLACEHOLDER), 14),
            t.title
        );
    }
}

fn print_entry(task_title: &str, entry: &ActivityEntry) {
    let mut line = format!(
        "{:>12}  {}  {}",
        format_relative(entry.timestamp),
        task_title,
        describe_entry(entry)
    );
    if let Some(comment) = &entry.comment {
        line.push_str(&format!("  \"{comment}\""));
    }
    println!("{line}");
}

/// One-line description of an activity entry. The core stores structured
/// changes; turning them into a sentence is strictly a display concern.
pub fn describe_entry(entry: &ActivityEntry) -> String {
    match entry.event_type {
        EventType::Create => {
            let column = entry
                .details
                .first()
                .map(|d| d.new_value.as_str())
                .unwrap_or(PLACEHOLDER);
            format!("created in {column}")
        }
        EventType::Move => match entry.details.first() {
            Some(d) => format!(
                "moved from {} to {}",
                d.old_value.as_deref().unwrap_or(PLACEHOLDER),
                d.new_value
            ),
            None => "moved".to_string(),
        },
        EventType::Update => {
            let fields: Vec<&str> = entry.details.iter().map(|d| d.field.as_str()).collect();
            if fields.is_empty() {
                "updated".to_string()
            } else {
                format!("updated {}", fields.join(", "))
            }
        }
        EventType::Other => "action taken".to_string(),
    }
}

/// Parse human-readable date input.
///
/// Supports "today", "tomorrow", "in Nd", "in Nw" and the YYYY-MM-DD format.
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_date_or_exit(s: &str) -> NaiveDate {
    match parse_date_input(s) {
        Some(d) => d,
        None => {
            eprintln!("Unrecognised date '{s}'. Use YYYY-MM-DD, \"today\", \"tomorrow\" or \"in Nd\".");
            std::process::exit(1);
        }
    }
}

/// Format an activity timestamp relative to now ("just now", "5m ago").
pub fn format_relative(ts: DateTime<Utc>) -> String {
    let delta = Utc::now() - ts;
    if delta.num_seconds() < 60 {
        "just now".into()
    } else if delta.num_minutes() < 60 {
        format!("{}m ago", delta.num_minutes())
    } else if delta.num_hours() < 24 {
        format!("{}h ago", delta.num_hours())
    } else if delta.num_days() < 30 {
        format!("{}d ago", delta.num_days())
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}

/// Format an end date relative to today ("today", "in 3d", "2d late").
pub fn format_date_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => PLACEHOLDER.into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {delta}d")
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| PLACEHOLDER.into())
}

/// First segment of a uuid, enough to address a task interactively.
pub fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
