//! CLI command handlers
//!
//! This module contains all CLI-related functionality including:
//! - Argument parsing structures
//! - Command implementations
//! - Result reporting

pub mod args;
pub mod commands;
pub mod report;
pub mod router;

pub use args::{Cli, Commands, OutputFormat, RunArgs};
pub use router::execute_command;
