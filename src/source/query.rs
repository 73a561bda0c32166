//! Paginated repository search as an item source

use super::{ItemSource, ItemStream, SourceCursor, SourcedItem};
use crate::chain::ChainItem;
use crate::github::{QueryBackend, RepoQuery, Repository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Streams the result set of a repository search, one page at a time. The
/// cursor indexes into the flattened result sequence, so resuming mid-page
/// refetches that page and skips the already-emitted prefix.
pub struct QuerySource {
    backend: Arc<dyn QueryBackend>,
    query: RepoQuery,
}

impl QuerySource {
    pub fn new(backend: Arc<dyn QueryBackend>, query: RepoQuery) -> Self {
        Self { backend, query }
    }
}

#[async_trait]
impl ItemSource for QuerySource {
    async fn produce(&self, cursor: Option<SourceCursor>) -> Result<Box<dyn ItemStream>> {
        Ok(Box::new(QueryStream {
            backend: Arc::clone(&self.backend),
            query: self.query.clone(),
            next_index: cursor.unwrap_or_default().index,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }
}

struct QueryStream {
    backend: Arc<dyn QueryBackend>,
    query: RepoQuery,
    next_index: usize,
    buffer: VecDeque<Repository>,
    exhausted: bool,
}

impl QueryStream {
    async fn fill_buffer(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        let per_page = self.query.per_page.max(1) as usize;
        let page = self.next_index / per_page + 1;
        let offset = self.next_index % per_page;

        debug!("Fetching page {page} of repository search '{}'", self.query.q);
        let results = self
            .backend
            .search_repositories(&self.query.q, page as u32, per_page as u32)
            .await
            .context("repository search failed")?;

        if results.items.len() < per_page {
            self.exhausted = true;
        }
        self.buffer.extend(results.items.into_iter().skip(offset));
        if self.buffer.is_empty() {
            self.exhausted = true;
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStream for QueryStream {
    async fn next_item(&mut self) -> Result<Option<SourcedItem>> {
        if self.buffer.is_empty() {
            self.fill_buffer().await?;
        }
        let Some(repo) = self.buffer.pop_front() else {
            return Ok(None);
        };
        self.next_index += 1;
        Ok(Some(SourcedItem {
            item: ChainItem::new(repo),
            cursor: SourceCursor {
                index: self.next_index,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{
        CodeMatch, CommitMatch, CommitQuery, FileQuery, GitHubError, SearchPage,
    };
    use std::sync::Mutex;

    struct PagedBackend {
        repos: Vec<Repository>,
        pages_fetched: Mutex<Vec<u32>>,
    }

    fn repo(id: u64) -> Repository {
        Repository {
            id,
            name: format!("repo{id}"),
            full_name: format!("octo/repo{id}"),
            html_url: None,
            clone_url: None,
            default_branch: None,
            stargazers_count: None,
            language: None,
        }
    }

    #[async_trait]
    impl QueryBackend for PagedBackend {
        async fn search_repositories(
            &self,
            _query: &str,
            page: u32,
            per_page: u32,
        ) -> Result<SearchPage<Repository>, GitHubError> {
            self.pages_fetched.lock().unwrap().push(page);
            let start = ((page - 1) * per_page) as usize;
            let items: Vec<Repository> = self
                .repos
                .iter()
                .skip(start)
                .take(per_page as usize)
                .cloned()
                .collect();
            Ok(SearchPage {
                total_count: self.repos.len() as u64,
                incomplete_results: false,
                items,
            })
        }

        async fn search_code(
            &self,
            _repo: &str,
            _query: &FileQuery,
        ) -> Result<Vec<CodeMatch>, GitHubError> {
            unimplemented!("not used by source tests")
        }

        async fn search_commits(
            &self,
            _repo: &str,
            _query: &CommitQuery,
        ) -> Result<Vec<CommitMatch>, GitHubError> {
            unimplemented!("not used by source tests")
        }
    }

    fn source(count: u64, per_page: u32) -> (QuerySource, Arc<PagedBackend>) {
        let backend = Arc::new(PagedBackend {
            repos: (1..=count).map(repo).collect(),
            pages_fetched: Mutex::new(Vec::new()),
        });
        let query = RepoQuery {
            q: "language:go".to_string(),
            per_page,
        };
        (QuerySource::new(backend.clone(), query), backend)
    }

    async fn drain(stream: &mut Box<dyn ItemStream>) -> Vec<SourcedItem> {
        let mut out = Vec::new();
        while let Some(sourced) = stream.next_item().await.unwrap() {
            out.push(sourced);
        }
        out
    }

    #[tokio::test]
    async fn test_emits_all_pages_in_order() {
        let (source, backend) = source(5, 2);
        let mut stream = source.produce(None).await.unwrap();
        let emitted = drain(&mut stream).await;

        let ids: Vec<u64> = emitted.iter().map(|s| s.item.repo.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(*backend.pages_fetched.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cursor_resumes_after_emitted_item() {
        let (source, _) = source(5, 2);
        let mut stream = source.produce(None).await.unwrap();
        let first = stream.next_item().await.unwrap().unwrap();
        let second = stream.next_item().await.unwrap().unwrap();
        assert_eq!(second.cursor, SourceCursor { index: 2 });

        // A fresh stream from the second item's cursor skips both.
        let mut resumed = source.produce(Some(second.cursor)).await.unwrap();
        let emitted = drain(&mut resumed).await;
        let ids: Vec<u64> = emitted.iter().map(|s| s.item.repo.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(first.cursor, SourceCursor { index: 1 });
    }

    #[tokio::test]
    async fn test_mid_page_resume_skips_offset() {
        let (source, backend) = source(4, 3);
        let mut stream = source.produce(Some(SourceCursor { index: 1 })).await.unwrap();
        let emitted = drain(&mut stream).await;

        let ids: Vec<u64> = emitted.iter().map(|s| s.item.repo.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        // First fetch is the page containing index 1, not page 1 restarted.
        assert_eq!(backend.pages_fetched.lock().unwrap()[0], 1);
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let (source, _) = source(0, 2);
        let mut stream = source.produce(None).await.unwrap();
        assert!(stream.next_item().await.unwrap().is_none());
    }
}
