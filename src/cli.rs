use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed kanban board CLI.
/// Storage defaults to ~/.kanban/kanban_tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "kanban", version, about = "Kanban task board with an append-only activity log")]
pub struct Cli {
    /// Path to the JSON board document.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
