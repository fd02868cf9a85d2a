#![doc = "plugin-registry-core: resolution and aggregation pipeline for the community plugin registry."]

//! This crate contains the registry's core logic: the repository-host facade,
//! the per-repository resolver, the batch aggregator and the artifact writer.
//! CLI glue and the small maintenance utilities live in the `plugin-registry`
//! binary crate.
//!
//! # Usage
//! Add this as a dependency for all resolution, aggregation and output code.

pub mod contract;
pub mod generate;
pub mod github;
pub mod output;
pub mod record;
pub mod resolver;
