//! # procdrain
//!
//! Run external programs, drain their stdout and stderr concurrently, and
//! turn the outcome into captured output or a structured error.
//!
//! ## Usage
//!
//! ```bash
//! procdrain run [--live] [--timeout 30s] -- docker pull alpine
//! ```
//!
//! ## Modules
//!
//! - `subprocess` - Spawning, output draining, cleanup and exit-code translation
//! - `config` - Runner tuning (chunk size, grace period, capture limits)
//! - `cli` - Command-line surface over the runner
//! - `app` - Logging setup and fatal error reporting
pub mod app;
pub mod cli;
pub mod config;
pub mod subprocess;
