//! # Kanban - local-first task board
//!
//! A single-user kanban board that keeps tasks, and the full history of every
//! change to them, in one local JSON document.
//!
//! ## Key Features
//!
//! - **Fixed Workflow Columns**: Backlog, In Progress, Error/Blocked,
//!   Completed and N/A, matching the classic five-column board
//! - **Append-Only Activity Log**: every create, move and genuine edit is
//!   recorded with a timestamp, field-level diffs and an optional comment
//! - **Global Feed**: one chronological view across every task's history
//! - **Multiple Interfaces**: full CLI for scripting + an interactive
//!   terminal board for visual management
//! - **Local File Storage**: a single JSON document, safe to keep in git
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task to the backlog
//! kanban add "Fix login bug" --category bug --department Ops --end tomorrow
//!
//! # Walk the board interactively
//! kanban board
//!
//! # Move it along and leave a note
//! kanban move <id> in-progress --comment "repro found"
//!
//! # Read the history
//! kanban log <id>
//! kanban feed
//! ```
//!
//! Data is stored in `~/.kanban/kanban_tasks.json`; pass `--db` to use a
//! different document. No edit, move or delete ever rewrites history: the
//! activity log only grows, and disappears only with its task.

use std::path::PathBuf;

use clap::Parser;

pub mod activity;
pub mod board;
pub mod cli;
pub mod cmd;
pub mod fields;
pub mod store;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod form;
    pub mod run;
}

use board::Board;
use cli::Cli;
use cmd::*;

fn main() {
    let cli = Cli::parse();

    // Commands that never touch the board document
    match &cli.command {
        Commands::Columns => {
            cmd_columns();
            return;
        }
        Commands::Categories => {
            cmd_categories();
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        _ => {}
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".kanban");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create kanban directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
        dir.join("kanban_tasks.json")
    });

    let mut board = Board::open(&db_path);

    match cli.command {
        Commands::Add { title, details, start, end, department, category, status, comment } =>
            cmd_add(&mut board, title, details, start, end, department, category, status, comment),

        Commands::List { status, category } => cmd_list(&board, status, category),

        Commands::View { id } => cmd_view(&board, &id),

        Commands::Edit { id, title, details, start, end, department, category, status, clear_start, clear_end, comment } =>
            cmd_edit(&mut board, &id, title, details, start, end, department, category, status, clear_start, clear_end, comment),

        Commands::Move { id, status, comment } => cmd_move(&mut board, &id, status, comment),

        Commands::Delete { id, yes } => cmd_delete(&mut board, &id, yes),

        Commands::Log { id } => cmd_log(&board, &id),

        Commands::Feed { limit } => cmd_feed(&board, limit),

        Commands::Board => cmd_board(board),

        Commands::Columns | Commands::Categories | Commands::Completions { .. } => {
            unreachable!("handled above")
        }
    }
}
