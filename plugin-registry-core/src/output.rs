//! Serialization of a finished run into the four on-disk artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::generate::GenerateReport;
use crate::record::{ManifestInfo, PluginRecord};

/// Record keys absent from the diff baseline, so that successive runs only
/// differ where the upstream state did.
pub const COMPARE_IGNORE: [&str; 3] = ["last_fetched", "etag_release", "etag_repository"];

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A record as it appears in `diff/after.json`: the run-volatile fields named
/// in [`COMPARE_IGNORE`] are dropped, the key order contract is unchanged.
#[derive(Serialize)]
struct BaselineRecord<'a> {
    manifest: &'a ManifestInfo,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_prerelease: Option<&'a String>,
    last_updated: Option<&'a String>,
    last_version: Option<&'a String>,
    open_issues: u64,
    repository: &'a str,
    stargazers_count: u64,
    topics: &'a [String],
}

impl<'a> From<&'a PluginRecord> for BaselineRecord<'a> {
    fn from(record: &'a PluginRecord) -> Self {
        Self {
            manifest: &record.manifest,
            domain: &record.domain,
            last_prerelease: record.last_prerelease.as_ref(),
            last_updated: record.last_updated.as_ref(),
            last_version: record.last_version.as_ref(),
            open_issues: record.open_issues,
            repository: &record.repository,
            stargazers_count: record.stargazers_count,
            topics: &record.topics,
        }
    }
}

/// Write `data.json`, `diff/after.json`, `repositories.json` and
/// `summary.json` under `output_dir`, creating the directories as needed.
///
/// All four artifacts are written even for an empty run; nothing partial is
/// ever written mid-run.
pub fn write_artifacts(output_dir: &Path, report: &GenerateReport) -> Result<(), OutputError> {
    fs::create_dir_all(output_dir.join("diff"))?;

    let baseline: BTreeMap<&String, BaselineRecord<'_>> = report
        .plugins
        .iter()
        .map(|(id, record)| (id, BaselineRecord::from(record)))
        .collect();

    write_json(&output_dir.join("data.json"), &report.plugins)?;
    write_json(&output_dir.join("diff").join("after.json"), &baseline)?;
    write_json(
        &output_dir.join("repositories.json"),
        &report.valid_repositories,
    )?;
    write_json(&output_dir.join("summary.json"), &report.summary)?;

    info!(
        dir = %output_dir.display(),
        plugins = report.plugins.len(),
        "Artifacts written"
    );
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), OutputError> {
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}
