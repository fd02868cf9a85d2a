//! # contract: interface to the repository hosting API
//!
//! This module defines a single trait ([`RepoHost`]) and the supporting data
//! types for the four read operations the pipeline depends on: repository
//! metadata, directory listings, file contents and release listings.
//!
//! ## Interface & Extensibility
//! - Implement the [`RepoHost`] trait to back the pipeline with a different
//!   hosting API (or a test double).
//! - All methods are async and return [`HostError`], which separates the
//!   routine "not found" case from transport-level failures.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Errors surfaced by a [`RepoHost`] implementation.
///
/// `NotFound` is routine (deleted or renamed-away repositories and files) and
/// is never escalated to a process failure by callers.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("resource not found")]
    NotFound,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
}

/// Repository metadata returned by [`RepoHost::get_repository`].
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    /// Host-assigned numeric id, stable across renames.
    pub id: u64,
    /// Canonical `owner/name` as the host reports it.
    pub full_name: String,
    pub archived: bool,
    pub updated_at: Option<String>,
    pub open_issues_count: u64,
    pub stargazers_count: u64,
    pub topics: Vec<String>,
    /// Cache-validation token from the response, if the host provided one.
    pub etag: Option<String>,
}

/// A single entry in a directory listing.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

/// Raw file contents as served by the host, still in its base64 transport
/// encoding.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content_base64: String,
}

/// A single published release.
#[derive(Debug, Clone)]
pub struct Release {
    pub tag_name: String,
    pub prerelease: bool,
    pub created_at: DateTime<Utc>,
}

/// All releases of a repository plus the listing's cache-validation token.
///
/// No ordering is guaranteed; callers order by creation time themselves.
#[derive(Debug, Clone, Default)]
pub struct ReleaseList {
    pub releases: Vec<Release>,
    pub etag: Option<String>,
}

/// Trait for the four read operations against the repository hosting API.
///
/// The trait is implemented by real clients and by test mocks. It is
/// `Send + Sync` and intended for async/await usage; one instance is shared
/// by all concurrent resolutions in a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch repository metadata (archival state, canonical name, counters).
    async fn get_repository(&self, repo: &str) -> Result<RepositoryInfo, HostError>;

    /// List the entries of `path` inside the repository. Pass an empty path
    /// for the repository root.
    async fn list_directory(&self, repo: &str, path: &str) -> Result<Vec<DirEntry>, HostError>;

    /// Fetch a single file in the host's transport encoding.
    async fn get_file_content(&self, repo: &str, path: &str) -> Result<FileContent, HostError>;

    /// List all releases of the repository. An empty list is not an error.
    async fn list_releases(&self, repo: &str) -> Result<ReleaseList, HostError>;
}
