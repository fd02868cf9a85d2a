//! Per-repository resolution: the validation/fetch sequence that turns one
//! repository identifier into a metadata record or a classified rejection.
//!
//! The sequence short-circuits in this order: archival/rename check, domain
//! discovery, manifest validation, release resolution, record assembly.
//! Errors never cross this module's boundary; every failure path collapses
//! into a [`Resolution`] variant consumed by the aggregator.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::contract::{DirEntry, EntryKind, HostError, ReleaseList, RepoHost};
use crate::record::{Manifest, ManifestInfo, PluginRecord};

/// Directory every plugin repository must carry at its root.
pub const PLUGINS_DIR: &str = "custom_plugins";

/// Outcome of resolving one repository.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Fully validated plugin, keyed by the host-assigned repository id.
    Valid { id: u64, record: PluginRecord },
    /// The host marks the repository archived; terminal, distinct from a skip.
    Archived,
    /// Anything else: the repository stays out of the dataset this run.
    Rejected(RejectReason),
}

/// Why a repository was rejected. `Display` yields the snake_case kind used
/// in logs and maintainer-facing output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing_plugins_folder")]
    MissingPluginsFolder,
    #[error("ambiguous_domain")]
    AmbiguousDomain { found: usize },
    #[error("manifest_not_found")]
    ManifestNotFound,
    #[error("manifest_invalid_json")]
    ManifestInvalidJson,
    #[error("domain_mismatch")]
    DomainMismatch {
        folder: String,
        manifest: Option<String>,
    },
    #[error("not_found")]
    NotFound,
    #[error("fetch_error")]
    FetchError,
}

/// Resolve a single repository into a [`Resolution`].
///
/// The working identifier is switched to the host's canonical name as soon as
/// the repository metadata arrives, so a renamed repository resolves under its
/// new name. No retries happen within a run.
pub async fn resolve<H: RepoHost + ?Sized>(host: &H, input: &str) -> Resolution {
    info!(repo = %input, "Fetching repository metadata");
    let meta = match host.get_repository(input).await {
        Ok(meta) => meta,
        Err(HostError::NotFound) => {
            warn!(repo = %input, "Repository not found");
            return Resolution::Rejected(RejectReason::NotFound);
        }
        Err(e) => {
            error!(repo = %input, error = %e, "Error fetching repository metadata");
            return Resolution::Rejected(RejectReason::FetchError);
        }
    };

    if meta.archived {
        warn!(repo = %input, "Repository is archived");
        return Resolution::Archived;
    }

    let repo = meta.full_name.clone();
    if !repo.eq_ignore_ascii_case(input) {
        info!(repo = %input, canonical = %repo, "Repository renamed upstream, using canonical name");
    }

    let domain = match discover_domain(host, &repo).await {
        Ok(domain) => domain,
        Err(reason) => return Resolution::Rejected(reason),
    };

    let manifest = match validate_manifest(host, &repo, &domain).await {
        Ok(manifest) => manifest,
        Err(reason) => return Resolution::Rejected(reason),
    };

    info!(repo = %repo, "Fetching releases");
    let releases = match host.list_releases(&repo).await {
        Ok(list) => list,
        Err(HostError::NotFound) => {
            // A 404 on the release listing means "no releases yet".
            warn!(repo = %repo, "Zero releases found");
            ReleaseList::default()
        }
        Err(e) => {
            error!(repo = %repo, error = %e, "Error fetching releases");
            return Resolution::Rejected(RejectReason::FetchError);
        }
    };
    let (last_version, last_prerelease) = select_releases(&releases);

    let record = PluginRecord {
        manifest: ManifestInfo::from(&manifest),
        domain,
        etag_release: releases.etag.clone(),
        etag_repository: meta.etag.clone(),
        last_fetched: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        last_prerelease,
        last_updated: meta.updated_at.clone(),
        last_version,
        open_issues: meta.open_issues_count,
        repository: repo.clone(),
        stargazers_count: meta.stargazers_count,
        topics: meta.topics.clone(),
    };

    info!(repo = %repo, domain = %record.domain, "Metadata successfully resolved");
    Resolution::Valid {
        id: meta.id,
        record,
    }
}

/// Find the single domain folder under `custom_plugins/`.
async fn discover_domain<H: RepoHost + ?Sized>(
    host: &H,
    repo: &str,
) -> Result<String, RejectReason> {
    info!(repo = %repo, "Fetching plugin domain");
    let root = match host.list_directory(repo, "").await {
        Ok(entries) => entries,
        Err(e) => return Err(listing_reject(repo, e)),
    };

    let has_plugins_dir = root
        .iter()
        .any(|entry| entry.name == PLUGINS_DIR && entry.kind == EntryKind::Dir);
    if !has_plugins_dir {
        error!(repo = %repo, "The `custom_plugins/` folder is missing");
        return Err(RejectReason::MissingPluginsFolder);
    }

    let entries = match host.list_directory(repo, PLUGINS_DIR).await {
        Ok(entries) => entries,
        Err(e) => return Err(listing_reject(repo, e)),
    };
    let mut subdirs: Vec<DirEntry> = entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::Dir)
        .collect();
    if subdirs.len() != 1 {
        error!(
            repo = %repo,
            found = subdirs.len(),
            "Expected exactly one domain folder inside `custom_plugins/`"
        );
        return Err(RejectReason::AmbiguousDomain {
            found: subdirs.len(),
        });
    }

    let domain = subdirs.remove(0).name;
    info!(repo = %repo, domain = %domain, "Found domain");
    Ok(domain)
}

/// Fetch and decode the manifest, requiring its `domain` field to equal the
/// discovered folder name.
async fn validate_manifest<H: RepoHost + ?Sized>(
    host: &H,
    repo: &str,
    domain: &str,
) -> Result<Manifest, RejectReason> {
    let path = format!("{PLUGINS_DIR}/{domain}/manifest.json");
    let file = match host.get_file_content(repo, &path).await {
        Ok(file) => file,
        Err(HostError::NotFound) => {
            error!(repo = %repo, path = %path, "Manifest file not found");
            return Err(RejectReason::ManifestNotFound);
        }
        Err(e) => {
            error!(repo = %repo, path = %path, error = %e, "Error fetching manifest");
            return Err(RejectReason::FetchError);
        }
    };

    let manifest = match decode_manifest(&file.content_base64) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(repo = %repo, path = %path, error = %e, "Manifest contains invalid JSON");
            return Err(RejectReason::ManifestInvalidJson);
        }
    };

    if manifest.domain.as_deref() != Some(domain) {
        error!(
            repo = %repo,
            folder = %domain,
            manifest_domain = ?manifest.domain,
            "Domain mismatch between folder and manifest"
        );
        return Err(RejectReason::DomainMismatch {
            folder: domain.to_string(),
            manifest: manifest.domain.clone(),
        });
    }

    info!(repo = %repo, domain = %domain, "Domain validated against manifest");
    Ok(manifest)
}

#[derive(Debug, Error)]
enum ManifestDecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn decode_manifest(content_base64: &str) -> Result<Manifest, ManifestDecodeError> {
    // The transport encoding wraps base64 across lines; strip whitespace
    // before decoding.
    let cleaned: String = content_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64_STANDARD.decode(cleaned.as_bytes())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pick the newest stable and newest prerelease tags by creation time.
///
/// Ordering is by `created_at` descending, not by semantic version; tagging
/// irregularities are accepted as-is.
fn select_releases(list: &ReleaseList) -> (Option<String>, Option<String>) {
    let mut releases: Vec<_> = list.releases.iter().collect();
    releases.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let last_version = releases
        .iter()
        .find(|release| !release.prerelease)
        .map(|release| release.tag_name.clone());
    let last_prerelease = releases
        .iter()
        .find(|release| release.prerelease)
        .map(|release| release.tag_name.clone());
    (last_version, last_prerelease)
}

fn listing_reject(repo: &str, err: HostError) -> RejectReason {
    match err {
        HostError::NotFound => {
            warn!(repo = %repo, "Repository contents not found");
            RejectReason::NotFound
        }
        e => {
            error!(repo = %repo, error = %e, "Error listing repository contents");
            RejectReason::FetchError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{FileContent, MockRepoHost, Release, RepositoryInfo};
    use chrono::TimeZone;

    fn repo_info(full_name: &str, id: u64, archived: bool) -> RepositoryInfo {
        RepositoryInfo {
            id,
            full_name: full_name.to_string(),
            archived,
            updated_at: Some("2026-07-01T12:00:00Z".to_string()),
            open_issues_count: 2,
            stargazers_count: 17,
            topics: vec!["plugin".to_string()],
            etag: Some("W/\"repo\"".to_string()),
        }
    }

    fn dir(name: &str) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            kind: EntryKind::Dir,
        }
    }

    fn file(name: &str) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            kind: EntryKind::File,
        }
    }

    fn manifest_content(json: &str) -> FileContent {
        FileContent {
            content_base64: BASE64_STANDARD.encode(json),
        }
    }

    fn release(tag: &str, prerelease: bool, created_secs: i64) -> Release {
        Release {
            tag_name: tag.to_string(),
            prerelease,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        }
    }

    /// Mock for a repository that passes every validation step.
    fn valid_host(repo: &'static str, domain: &'static str) -> MockRepoHost {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .withf(move |r| r == repo)
            .returning(move |_| Ok(repo_info(repo, 1001, false)));
        host.expect_list_directory()
            .withf(move |r, path| r == repo && path.is_empty())
            .returning(|_, _| Ok(vec![file("README.md"), dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(move |r, path| r == repo && path == PLUGINS_DIR)
            .returning(move |_, _| Ok(vec![dir(domain)]));
        host.expect_get_file_content()
            .withf(move |r, path| {
                r == repo && path == format!("{PLUGINS_DIR}/{domain}/manifest.json")
            })
            .returning(move |_, _| {
                Ok(manifest_content(&format!(
                    r#"{{"domain": "{domain}", "name": "Lap Timer", "description": "Counts laps"}}"#
                )))
            });
        host.expect_list_releases()
            .withf(move |r| r == repo)
            .returning(|_| {
                Ok(ReleaseList {
                    releases: vec![release("v1.0.0", false, 100)],
                    etag: Some("W/\"rel\"".to_string()),
                })
            });
        host
    }

    #[tokio::test]
    async fn resolves_full_record() {
        let host = valid_host("owner/lap-timer", "lap_timer");
        let resolution = resolve(&host, "owner/lap-timer").await;

        match resolution {
            Resolution::Valid { id, record } => {
                assert_eq!(id, 1001);
                assert_eq!(record.domain, "lap_timer");
                assert_eq!(record.repository, "owner/lap-timer");
                assert_eq!(record.manifest.name.as_deref(), Some("Lap Timer"));
                assert_eq!(record.last_version.as_deref(), Some("v1.0.0"));
                assert_eq!(record.last_prerelease, None);
                assert_eq!(record.etag_repository.as_deref(), Some("W/\"repo\""));
                assert_eq!(record.etag_release.as_deref(), Some("W/\"rel\""));
                assert!(!record.last_fetched.is_empty());
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn archived_repository_short_circuits() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/old", 7, true)));
        // No other expectations: any further call would panic the mock.

        let resolution = resolve(&host, "owner/old").await;
        assert!(matches!(resolution, Resolution::Archived));
    }

    #[tokio::test]
    async fn renamed_repository_adopts_canonical_name() {
        let host = valid_host("newowner/lap-timer", "lap_timer");
        let resolution = resolve(&host, "newowner/lap-timer").await;
        assert!(matches!(resolution, Resolution::Valid { .. }));

        // Same canonical answer for a stale input name: every follow-up call
        // must use the canonical identifier.
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .withf(|r| r == "oldowner/lap-timer")
            .returning(|_| Ok(repo_info("newowner/lap-timer", 1001, false)));
        host.expect_list_directory()
            .withf(|r, path| r == "newowner/lap-timer" && path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|r, path| r == "newowner/lap-timer" && path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("lap_timer")]));
        host.expect_get_file_content()
            .withf(|r, _| r == "newowner/lap-timer")
            .returning(|_, _| {
                Ok(manifest_content(
                    r#"{"domain": "lap_timer", "name": "Lap Timer"}"#,
                ))
            });
        host.expect_list_releases()
            .withf(|r| r == "newowner/lap-timer")
            .returning(|_| Ok(ReleaseList::default()));

        match resolve(&host, "oldowner/lap-timer").await {
            Resolution::Valid { record, .. } => {
                assert_eq!(record.repository, "newowner/lap-timer");
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_plugins_folder_rejects() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/empty", 2, false)));
        host.expect_list_directory()
            .returning(|_, _| Ok(vec![file("README.md"), dir("docs")]));

        let resolution = resolve(&host, "owner/empty").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::MissingPluginsFolder)
        ));
    }

    #[tokio::test]
    async fn multiple_domain_folders_reject() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/two", 3, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("one"), dir("two")]));

        let resolution = resolve(&host, "owner/two").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::AmbiguousDomain { found: 2 })
        ));
    }

    #[tokio::test]
    async fn zero_domain_folders_reject() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/none", 4, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![file("readme.txt")]));

        let resolution = resolve(&host, "owner/none").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::AmbiguousDomain { found: 0 })
        ));
    }

    #[tokio::test]
    async fn manifest_not_found_rejects() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/bare", 5, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("bare")]));
        host.expect_get_file_content()
            .returning(|_, _| Err(HostError::NotFound));

        let resolution = resolve(&host, "owner/bare").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::ManifestNotFound)
        ));
    }

    #[tokio::test]
    async fn manifest_invalid_json_rejects() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/broken", 6, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("broken")]));
        host.expect_get_file_content()
            .returning(|_, _| Ok(manifest_content("{not json")));

        let resolution = resolve(&host, "owner/broken").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::ManifestInvalidJson)
        ));
    }

    #[tokio::test]
    async fn manifest_domain_mismatch_rejects() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/mismatch", 8, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("bar")]));
        host.expect_get_file_content()
            .returning(|_, _| Ok(manifest_content(r#"{"domain": "foo"}"#)));

        match resolve(&host, "owner/mismatch").await {
            Resolution::Rejected(RejectReason::DomainMismatch { folder, manifest }) => {
                assert_eq!(folder, "bar");
                assert_eq!(manifest.as_deref(), Some("foo"));
            }
            other => panic!("expected DomainMismatch, got {other:?}"),
        }
    }

    #[test]
    fn release_selection_prefers_newest_by_creation_time() {
        let list = ReleaseList {
            releases: vec![
                release("v2", false, 2),
                release("v3-rc", true, 3),
                release("v1", false, 1),
            ],
            etag: None,
        };
        let (last_version, last_prerelease) = select_releases(&list);
        assert_eq!(last_version.as_deref(), Some("v2"));
        assert_eq!(last_prerelease.as_deref(), Some("v3-rc"));
    }

    #[tokio::test]
    async fn release_not_found_means_no_releases() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Ok(repo_info("owner/unreleased", 9, false)));
        host.expect_list_directory()
            .withf(|_, path| path.is_empty())
            .returning(|_, _| Ok(vec![dir(PLUGINS_DIR)]));
        host.expect_list_directory()
            .withf(|_, path| path == PLUGINS_DIR)
            .returning(|_, _| Ok(vec![dir("unreleased")]));
        host.expect_get_file_content()
            .returning(|_, _| Ok(manifest_content(r#"{"domain": "unreleased"}"#)));
        host.expect_list_releases()
            .returning(|_| Err(HostError::NotFound));

        match resolve(&host, "owner/unreleased").await {
            Resolution::Valid { record, .. } => {
                assert_eq!(record.last_version, None);
                assert_eq!(record.last_prerelease, None);
                assert_eq!(record.etag_release, None);
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repository_not_found_is_a_skip() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Err(HostError::NotFound));

        let resolution = resolve(&host, "owner/deleted").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::NotFound)
        ));
    }

    #[tokio::test]
    async fn transport_error_is_a_fetch_error() {
        let mut host = MockRepoHost::new();
        host.expect_get_repository()
            .returning(|_| Err(HostError::Transport("connection reset".to_string())));

        let resolution = resolve(&host, "owner/flaky").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::FetchError)
        ));
    }
}
