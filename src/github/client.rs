//! GitHub API client with retry logic

use super::types::{
    CodeMatch, CommitMatch, CommitQuery, FileQuery, Repository, SearchPage,
};
use super::{GitHubError, QueryBackend};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const GITHUB_API: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github+json";
/// Commit search historically sat behind this preview media type; current API
/// versions accept and ignore it.
const ACCEPT_COMMIT_SEARCH: &str = "application/vnd.github.cloak-preview+json";

/// Commit search items nest the message under `commit`
#[derive(Debug, Deserialize)]
struct CommitSearchItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: Option<String>,
}

/// GitHub search client. Rate-limit and server errors are retried a bounded
/// number of times with exponential backoff before surfacing to the caller.
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl GitHubClient {
    /// Create a new client. `token` is a personal access token; without one
    /// GitHub applies very low unauthenticated rate limits.
    pub fn new(token: Option<String>) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .user_agent(concat!("reposift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GitHubError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            max_retries: 3,
            retry_delay_ms: 2_000,
        })
    }

    /// Create a client from the `GITHUB_TOKEN` environment variable.
    pub fn from_env() -> Result<Self, GitHubError> {
        Self::new(std::env::var("GITHUB_TOKEN").ok())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> Result<T, GitHubError> {
        let mut attempt = 0;
        loop {
            match self.request(url, query, accept).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_retries || !Self::is_retryable(&err) {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.backoff_ms(&err, attempt);
                    warn!("GitHub request failed ({err}), retrying in {delay}ms");
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> Result<T, GitHubError> {
        debug!("GET {url} {query:?}");
        let mut request = self.client.get(url).header("Accept", accept).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Err(GitHubError::RateLimited { retry_after })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GitHubError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    fn is_retryable(error: &GitHubError) -> bool {
        match error {
            GitHubError::RateLimited { .. } => true,
            GitHubError::Status { status, .. } => *status >= 500,
            GitHubError::Request(e) => e.is_timeout() || e.is_connect(),
            GitHubError::Config(_) => false,
        }
    }

    fn backoff_ms(&self, error: &GitHubError, attempt: u32) -> u64 {
        if let GitHubError::RateLimited {
            retry_after: Some(seconds),
        } = error
        {
            return seconds * 1_000;
        }
        self.retry_delay_ms << (attempt - 1)
    }
}

#[async_trait]
impl QueryBackend for GitHubClient {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage<Repository>, GitHubError> {
        self.get_json(
            &format!("{GITHUB_API}/search/repositories"),
            &[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
            ACCEPT_JSON,
        )
        .await
    }

    async fn search_code(
        &self,
        repo: &str,
        query: &FileQuery,
    ) -> Result<Vec<CodeMatch>, GitHubError> {
        let page: SearchPage<CodeMatch> = self
            .get_json(
                &format!("{GITHUB_API}/search/code"),
                &[("q", query.to_query(repo))],
                ACCEPT_JSON,
            )
            .await?;
        Ok(page.items)
    }

    async fn search_commits(
        &self,
        repo: &str,
        query: &CommitQuery,
    ) -> Result<Vec<CommitMatch>, GitHubError> {
        let page: SearchPage<CommitSearchItem> = self
            .get_json(
                &format!("{GITHUB_API}/search/commits"),
                &[("q", query.to_query(repo))],
                ACCEPT_COMMIT_SEARCH,
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .map(|item| CommitMatch {
                sha: item.sha,
                message: item.commit.message,
            })
            .collect())
    }
}
