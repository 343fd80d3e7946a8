//! CLI subcommand implementations.

pub mod activities;
pub mod clear;
pub mod export;
pub mod history;
pub mod status;
#[cfg(test)]
mod testing;
pub mod timer;
pub mod util;
pub mod watch;
