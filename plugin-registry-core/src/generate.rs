//! Batch aggregation: fan the resolver out over the repository universe and
//! reduce the results into the run's dataset and summary.
//!
//! # Concurrency contract
//! - Every repository resolves independently against the shared host session;
//!   resolutions run concurrently without coordination or shared state.
//! - The join is all-complete: one slow or failing repository delays the final
//!   output but never cancels or blocks its siblings.
//! - The reduction is strictly sequential and walks results in original input
//!   order, so counters and the valid-repositories list are deterministic.
//!
//! # Error Handling
//! A fault in one repository never aborts the batch: the resolver converts
//! every failure into a classification before it reaches this module.

use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contract::RepoHost;
use crate::record::PluginRecord;
use crate::resolver::{resolve, Resolution};

/// Counters for one full run, persisted as `summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_plugins: usize,
    pub valid_plugins: usize,
    pub archived_plugins: usize,
    pub renamed_plugins: usize,
    pub skipped_plugins: usize,
    pub execution_time_seconds: f64,
}

/// Everything a run produces, ready for the output writer.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    /// Host-assigned numeric repository id (stringified) mapped to its
    /// record. A `BTreeMap` keeps key order stable run-to-run.
    pub plugins: BTreeMap<String, PluginRecord>,
    /// Valid `owner/name` strings in original input order.
    pub valid_repositories: Vec<String>,
    pub summary: RunSummary,
}

/// Resolve every repository in `repos` and aggregate the outcomes.
///
/// Renames are detected index-aligned: each input entry is compared against
/// its own resolved output, so duplicate names in the input cannot
/// misattribute the count.
pub async fn generate<H: RepoHost + ?Sized>(host: &H, repos: &[String]) -> GenerateReport {
    let started = Instant::now();
    info!(total = repos.len(), "Starting metadata generation");

    let resolutions = join_all(repos.iter().map(|repo| resolve(host, repo))).await;

    let mut plugins = BTreeMap::new();
    let mut valid_repositories = Vec::new();
    let mut archived_plugins = 0;
    let mut renamed_plugins = 0;
    let mut skipped_plugins = 0;

    for (input, resolution) in repos.iter().zip(resolutions) {
        match resolution {
            Resolution::Archived => archived_plugins += 1,
            Resolution::Rejected(reason) => {
                warn!(repo = %input, reason = %reason, "Repository skipped");
                skipped_plugins += 1;
            }
            Resolution::Valid { id, record } => {
                if !record.repository.eq_ignore_ascii_case(input) {
                    renamed_plugins += 1;
                }
                valid_repositories.push(record.repository.clone());
                plugins.insert(id.to_string(), record);
            }
        }
    }

    let summary = RunSummary {
        total_plugins: repos.len(),
        valid_plugins: valid_repositories.len(),
        archived_plugins,
        renamed_plugins,
        skipped_plugins,
        execution_time_seconds: round2(started.elapsed().as_secs_f64()),
    };
    info!(
        valid = summary.valid_plugins,
        archived = summary.archived_plugins,
        renamed = summary.renamed_plugins,
        skipped = summary.skipped_plugins,
        elapsed_seconds = summary.execution_time_seconds,
        "Metadata generation finished"
    );

    GenerateReport {
        plugins,
        valid_repositories,
        summary,
    }
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
