//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Activity time tracker.
///
/// Times one activity at a time with pause support and keeps a history of
/// finished sessions that can be exported as CSV.
#[derive(Debug, Parser)]
#[command(name = "tt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List or register activities.
    #[command(subcommand)]
    Activities(ActivitiesAction),

    /// Choose the activity to time next.
    Select {
        /// Activity name (registered if new).
        name: String,
    },

    /// Start timing, optionally selecting an activity first.
    Start {
        /// Activity name (registered if new).
        name: Option<String>,
    },

    /// Start when ready, pause when running, resume when paused.
    Toggle,

    /// Pause the running session.
    Pause,

    /// Resume the paused session.
    Resume,

    /// Stop the session and save it to history.
    Stop,

    /// Abandon the current session without saving.
    Discard,

    /// Show the current session.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Redraw the elapsed time once per second.
    Watch {
        /// Stop after this many redraws.
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Show saved sessions, newest first.
    History(HistoryArgs),

    /// Export history as CSV.
    Export {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all history.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// Activity catalog actions.
#[derive(Debug, Subcommand)]
pub enum ActivitiesAction {
    /// List known activities.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Register a new activity.
    Add {
        /// Activity name.
        name: String,
    },
}

#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct HistoryArgs {
    /// Only records not yet uploaded.
    #[arg(long)]
    pub pending: bool,

    /// Only sessions started today, in the configured time zone.
    #[arg(long)]
    pub today: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub action: Option<HistoryAction>,
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// Flag records as uploaded.
    MarkUploaded {
        /// Record IDs.
        #[arg(required_unless_present = "all_pending", conflicts_with = "all_pending")]
        ids: Vec<String>,

        /// Flag every pending record.
        #[arg(long)]
        all_pending: bool,
    },
}
