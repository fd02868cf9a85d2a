//! CLI interface for plugin-registry: command parsing, argument validation
//! and subcommand routing.
//!
//! All core business logic (resolution, aggregation, output shaping) lives in
//! the `plugin-registry-core` crate; this module is strictly CLI glue. The
//! async entrypoint [`run`] is extracted from `main` so integration tests can
//! invoke it programmatically.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plugin_registry_core::generate::generate;
use plugin_registry_core::github::GitHubClient;
use plugin_registry_core::output::write_artifacts;

use crate::load_plugins::load_plugins;
use crate::removed::check_removed;
use crate::sort_json::sort_json;

/// CLI for the community plugin registry metadata pipeline.
#[derive(Parser)]
#[clap(
    name = "plugin-registry",
    version,
    about = "Re-derive and publish metadata for community plugin repositories"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every repository in the plugin list and write the dataset artifacts
    Generate {
        /// Path to the JSON list of `owner/name` repositories
        #[clap(long, default_value = "plugins.json")]
        plugin_file: PathBuf,
        /// Directory receiving data.json, diff/after.json, repositories.json and summary.json
        #[clap(long, default_value = "output/plugin")]
        output_dir: PathBuf,
    },
    /// Sort JSON files, or verify that they are sorted
    SortJson {
        /// JSON files to process
        #[clap(required = true)]
        files: Vec<PathBuf>,
        /// Only check whether the files are sorted
        #[clap(long)]
        check: bool,
    },
    /// Check whether the repository in $REPOSITORY is listed as removed
    CheckRemoved {
        /// Path to the removed-plugins JSON list
        #[clap(long)]
        data_file: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            plugin_file,
            output_dir,
        } => {
            let repos = load_plugins(&plugin_file)?;
            let host = GitHubClient::new_from_env()?;
            let report = generate(&host, &repos).await;
            write_artifacts(&output_dir, &report)?;
            tracing::info!(
                command = "generate",
                valid = report.summary.valid_plugins,
                skipped = report.summary.skipped_plugins,
                "Generation complete"
            );
            Ok(())
        }
        Commands::SortJson { files, check } => {
            let mut all_sorted = true;
            for file in &files {
                if !sort_json(file, check) {
                    all_sorted = false;
                }
            }
            if all_sorted {
                Ok(())
            } else {
                Err(anyhow::anyhow!("one or more files are not sorted"))
            }
        }
        Commands::CheckRemoved { data_file } => check_removed(&data_file),
    }
}
