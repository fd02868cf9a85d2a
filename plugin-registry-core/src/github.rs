//! GitHub REST v3 implementation of the [`RepoHost`] facade.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ETAG};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::contract::{
    DirEntry, EntryKind, FileContent, HostError, Release, ReleaseList, RepoHost, RepositoryInfo,
};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Every request carries a timeout; a hung call surfaces as a transport
/// failure instead of stalling the whole run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared GitHub API session. One instance serves all concurrent resolutions;
/// `reqwest::Client` pools connections internally.
pub struct GitHubClient {
    http: Client,
    api_base: String,
}

impl GitHubClient {
    /// Build a client, authenticating with `token` when given.
    pub fn new(token: Option<String>) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| HostError::Transport(format!("invalid authorization header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent("plugin-registry")
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HostError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Build a client from the `GITHUB_TOKEN` environment variable, falling
    /// back to unauthenticated access when it is unset.
    pub fn new_from_env() -> Result<Self, HostError> {
        Self::new(std::env::var("GITHUB_TOKEN").ok())
    }

    /// Override the API base URL (tests against a local server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn get(&self, url: &str) -> Result<Response, HostError> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(HostError::NotFound),
            status if status.is_success() => Ok(response),
            status => Err(HostError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, HostError> {
    response
        .json()
        .await
        .map_err(|e| HostError::Transport(e.to_string()))
}

#[derive(Deserialize)]
struct RepoDto {
    id: u64,
    full_name: String,
    archived: bool,
    updated_at: Option<String>,
    open_issues_count: u64,
    stargazers_count: u64,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct ContentEntryDto {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct FileDto {
    content: String,
}

#[derive(Deserialize)]
struct ReleaseDto {
    tag_name: String,
    prerelease: bool,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn get_repository(&self, repo: &str) -> Result<RepositoryInfo, HostError> {
        let url = format!("{}/repos/{}", self.api_base, repo);
        let response = self.get(&url).await?;
        let etag = etag_of(&response);
        let dto: RepoDto = json_body(response).await?;
        Ok(RepositoryInfo {
            id: dto.id,
            full_name: dto.full_name,
            archived: dto.archived,
            updated_at: dto.updated_at,
            open_issues_count: dto.open_issues_count,
            stargazers_count: dto.stargazers_count,
            topics: dto.topics,
            etag,
        })
    }

    async fn list_directory(&self, repo: &str, path: &str) -> Result<Vec<DirEntry>, HostError> {
        let url = if path.is_empty() {
            format!("{}/repos/{}/contents", self.api_base, repo)
        } else {
            format!("{}/repos/{}/contents/{}", self.api_base, repo, path)
        };
        let response = self.get(&url).await?;
        let entries: Vec<ContentEntryDto> = json_body(response).await?;
        Ok(entries
            .into_iter()
            .map(|entry| DirEntry {
                name: entry.name,
                kind: if entry.kind == "dir" {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                },
            })
            .collect())
    }

    async fn get_file_content(&self, repo: &str, path: &str) -> Result<FileContent, HostError> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base, repo, path);
        let response = self.get(&url).await?;
        let dto: FileDto = json_body(response).await?;
        Ok(FileContent {
            content_base64: dto.content,
        })
    }

    async fn list_releases(&self, repo: &str) -> Result<ReleaseList, HostError> {
        let url = format!("{}/repos/{}/releases?per_page=100", self.api_base, repo);
        let response = self.get(&url).await?;
        let etag = etag_of(&response);
        let releases: Vec<ReleaseDto> = json_body(response).await?;
        Ok(ReleaseList {
            releases: releases
                .into_iter()
                .map(|release| Release {
                    tag_name: release.tag_name,
                    prerelease: release.prerelease,
                    created_at: release.created_at,
                })
                .collect(),
            etag,
        })
    }
}
