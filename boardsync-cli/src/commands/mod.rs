pub mod check;
pub mod diff;
pub mod run;

use anyhow::{Context, Result};

use boardsync_core::{config, SyncConfig};

/// Load configuration, optionally narrowed to a single pair.
pub fn load_config(pair: Option<&str>) -> Result<SyncConfig> {
    let config = config::load().context("invalid configuration")?;
    match pair {
        Some(name) => config
            .only_pair(name)
            .with_context(|| format!("unknown board pair '{name}'")),
        None => Ok(config),
    }
}
