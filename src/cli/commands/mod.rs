//! CLI command implementations

pub mod config;
pub mod run;

pub use config::run_config_command;
pub use run::run_command;
