//! `procdrain config`: show the effective runner configuration.

use anyhow::{Context, Result};
use std::path::Path;

use super::run::load_config;

pub fn run_config_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
