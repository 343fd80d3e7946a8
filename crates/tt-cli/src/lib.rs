//! Time tracker CLI library.
//!
//! This crate provides the CLI interface for the time tracker: argument
//! parsing, configuration, the session hand-off between invocations, and the
//! controller that turns commands into session transitions.

mod cli;
pub mod commands;
mod config;
pub mod controller;
pub mod session_file;

pub use cli::{ActivitiesAction, Cli, Commands, HistoryAction, HistoryArgs};
pub use config::Config;
pub use controller::{Controller, TrackerStore};
pub use session_file::SessionFile;
