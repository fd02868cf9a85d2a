//! Looks up a repository in the removed-plugins list.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Check the repository named by the `REPOSITORY` environment variable
/// (lowercased) against the removed list at `data_file`.
pub fn check_removed(data_file: &Path) -> Result<()> {
    let repo = std::env::var("REPOSITORY")
        .map(|repo| repo.to_lowercase())
        .unwrap_or_default();
    if repo.is_empty() {
        bail!("'REPOSITORY' environment variable is not set or empty");
    }
    check_repository(&repo, data_file)
}

/// Fail when `repo` appears in the removed-plugins list.
pub fn check_repository(repo: &str, data_file: &Path) -> Result<()> {
    let raw = fs::read_to_string(data_file)
        .with_context(|| format!("could not read {}", data_file.display()))?;
    let removed: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in {}", data_file.display()))?;

    if removed.iter().any(|entry| entry.eq_ignore_ascii_case(repo)) {
        warn!(repo = %repo, "Repository is removed from the community store");
        bail!("'{repo}' is removed from the community store");
    }
    info!(repo = %repo, "Repository is not removed from the community store");
    Ok(())
}
