//! Wire types for the GitHub search API

use serde::{Deserialize, Serialize};

/// Repository descriptor as returned by the search API. Only the fields the
/// chain consumes are kept; everything else is ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    /// Numeric GitHub id, the item's stable unique key
    pub id: u64,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stargazers_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Repository search parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoQuery {
    /// Raw search qualifiers, e.g. `"language:go stars:>100"`
    pub q: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_per_page() -> u32 {
    30
}

/// Criteria for a code search scoped to one repository
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Free-text term searched in file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FileQuery {
    /// Build the `q` parameter for `/search/code`, scoped to `repo`.
    pub fn to_query(&self, repo: &str) -> String {
        let mut parts = Vec::new();
        if let Some(text) = &self.text {
            parts.push(text.clone());
        }
        parts.push(format!("repo:{repo}"));
        if let Some(filename) = &self.filename {
            parts.push(format!("filename:{filename}"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path:{path}"));
        }
        if let Some(extension) = &self.extension {
            parts.push(format!("extension:{extension}"));
        }
        parts.join(" ")
    }
}

/// Criteria for a commit search scoped to one repository
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommitQuery {
    /// Free-text term searched in commit messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl CommitQuery {
    /// Build the `q` parameter for `/search/commits`, scoped to `repo`.
    pub fn to_query(&self, repo: &str) -> String {
        let mut parts = Vec::new();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        parts.push(format!("repo:{repo}"));
        if let Some(author) = &self.author {
            parts.push(format!("author:{author}"));
        }
        if let Some(hash) = &self.hash {
            parts.push(format!("hash:{hash}"));
        }
        parts.join(" ")
    }
}

/// A file returned by code search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeMatch {
    pub name: String,
    /// Path relative to the repository root
    pub path: String,
}

/// A commit returned by commit search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitMatch {
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}
