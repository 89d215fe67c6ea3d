//! remote::github
//!
//! GitHub implementation of [`RepositoryHost`] over the REST API.
//!
//! # Endpoints
//!
//! - `GET /repos/{owner}/{repo}/commits/{ref}` for revision markers
//! - `GET /repos/{owner}/{repo}/tarball/{ref}` for source archives (the
//!   redirect to the download host is followed by the client)
//!
//! Requests are anonymous. The API base is configurable for GitHub
//! Enterprise installations and for tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::traits::{ArchiveBody, ArchiveStream, RemoteError, RepositoryHost};
use crate::core::types::RevisionMarker;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default User-Agent header value (GitHub rejects requests without one).
pub const DEFAULT_USER_AGENT: &str = concat!("modsync/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// GitHub repository host.
#[derive(Debug, Clone)]
pub struct GitHubHost {
    client: Client,
    api_base: String,
    user_agent: String,
}

impl GitHubHost {
    /// Host against api.github.com with default settings.
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_options(DEFAULT_API_BASE, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Host with a custom API base, user agent and request timeout.
    pub fn with_options(
        api_base: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, api_base, user_agent))
    }

    /// Host over an existing client.
    pub fn with_client(
        client: Client,
        api_base: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_base, owner, repo, path)
    }

    async fn get(&self, url: &str, accept: &'static str) -> Result<Response, RemoteError> {
        debug!(url, "GET");
        self.client
            .get(url)
            .headers(self.headers(accept))
            .send()
            .await
            .map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

/// Map a status of 400 or above to `RemoteError::Status`, consuming the body.
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let body = body.trim();
    let message = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body.to_string()
    };
    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<Signature>,
    committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: DateTime<Utc>,
}

impl CommitResponse {
    fn into_marker(self) -> Result<RevisionMarker, RemoteError> {
        let author = self.commit.author.map(|s| s.date);
        let committer = self.commit.committer.map(|s| s.date);
        match (author, committer) {
            (Some(a), Some(c)) => Ok(RevisionMarker::resolve(self.sha, a, c)),
            (Some(t), None) | (None, Some(t)) => Ok(RevisionMarker::resolve(self.sha, t, t)),
            (None, None) => Err(RemoteError::Decode(format!(
                "commit {} has no author or committer date",
                self.sha
            ))),
        }
    }
}

/// Archive body backed by a streaming HTTP response.
struct HttpBody {
    response: Response,
}

#[async_trait]
impl ArchiveBody for HttpBody {
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError> {
        let chunk = self.response.chunk().await.map_err(transport)?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

#[async_trait]
impl RepositoryHost for GitHubHost {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_last_commit(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<RevisionMarker, RemoteError> {
        let url = self.repo_url(owner, repo, &format!("commits/{}", reference));
        let response = self.get(&url, "application/vnd.github+json").await?;

        if response.status() == StatusCode::NOT_FOUND {
            // Drain so the connection can be reused.
            let _ = response.bytes().await;
            return Err(RemoteError::NotFound(format!(
                "{}/{}@{}",
                owner, repo, reference
            )));
        }
        let response = check_status(response).await?;

        let body = response.bytes().await.map_err(transport)?;
        let commit: CommitResponse =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        commit.into_marker()
    }

    async fn get_repo_archive(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<ArchiveStream, RemoteError> {
        let url = self.repo_url(owner, repo, &format!("tarball/{}", reference));
        let response = check_status(self.get(&url, "application/vnd.github+json").await?).await?;
        Ok(Box::new(HttpBody { response }))
    }
}

/// Parse a GitHub repository source into `(owner, repo)`.
///
/// Accepted forms:
/// - `https://github.com/owner/repo` (with or without `.git`)
/// - `git@github.com:owner/repo.git`
/// - `github.com/owner/repo`
///
/// # Example
///
/// ```
/// use modsync::remote::parse_source;
///
/// let (owner, repo) = parse_source("git@github.com:acme/sensor.git").unwrap();
/// assert_eq!(owner, "acme");
/// assert_eq!(repo, "sensor");
/// ```
pub fn parse_source(source: &str) -> Option<(String, String)> {
    let source = source.trim();
    let rest = source
        .strip_prefix("git@github.com:")
        .or_else(|| source.strip_prefix("https://github.com/"))
        .or_else(|| source.strip_prefix("http://github.com/"))
        .or_else(|| source.strip_prefix("github.com/"))?;

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
