//! GitHub search backend collaborator
//!
//! Exposes repository search, code search, and commit search behind the
//! [`QueryBackend`] trait so chains can run against the real API or a stub.

pub mod client;
pub mod types;


pub use client::GitHubClient;
pub use types::{
    CodeMatch, CommitMatch, CommitQuery, FileQuery, RepoQuery, Repository, SearchPage,
};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("GitHub rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("GitHub API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Query operations the chain's sources and tasks depend on.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// One page of a repository search, 1-based page number.
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage<Repository>, GitHubError>;

    /// Files matching `query` within a repository (`owner/name`).
    async fn search_code(
        &self,
        repo: &str,
        query: &FileQuery,
    ) -> Result<Vec<CodeMatch>, GitHubError>;

    /// Commits matching `query` within a repository (`owner/name`).
    async fn search_commits(
        &self,
        repo: &str,
        query: &CommitQuery,
    ) -> Result<Vec<CommitMatch>, GitHubError>;
}
