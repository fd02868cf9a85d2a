//! Loads the repository universe from the plugin list file.
//!
//! This is the only place where the inbound `plugins.json` is parsed. A
//! missing file is not fatal: the run degrades to an empty universe so that
//! a fresh checkout still produces all artifacts.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Read the JSON list of `owner/name` repositories at `path`.
pub fn load_plugins(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        warn!(file = %path.display(), "Plugin list file not found, using an empty list");
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read plugin list {}", path.display()))?;
    let repos: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in plugin list {}", path.display()))?;
    info!(file = %path.display(), count = repos.len(), "Loaded plugin list");
    Ok(repos)
}
