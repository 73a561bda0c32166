#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::chain::{ChainItem, Decision, Task};
    use crate::github::{
        CodeMatch, CommitMatch, CommitQuery, FileQuery, GitHubError, QueryBackend, Repository,
        SearchPage,
    };
    use crate::subprocess::SubprocessManager;
    use async_trait::async_trait;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;

    struct StubBackend {
        code_matches: Vec<CodeMatch>,
        commit_matches: Vec<CommitMatch>,
    }

    impl StubBackend {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                code_matches: Vec::new(),
                commit_matches: Vec::new(),
            })
        }

        fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                code_matches: files
                    .iter()
                    .map(|(name, path)| CodeMatch {
                        name: name.to_string(),
                        path: path.to_string(),
                    })
                    .collect(),
                commit_matches: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl QueryBackend for StubBackend {
        async fn search_repositories(
            &self,
            _query: &str,
            _page: u32,
            _per_page: u32,
        ) -> Result<SearchPage<Repository>, GitHubError> {
            Ok(SearchPage {
                total_count: 0,
                incomplete_results: false,
                items: Vec::new(),
            })
        }

        async fn search_code(
            &self,
            _repo: &str,
            _query: &FileQuery,
        ) -> Result<Vec<CodeMatch>, GitHubError> {
            Ok(self.code_matches.clone())
        }

        async fn search_commits(
            &self,
            _repo: &str,
            _query: &CommitQuery,
        ) -> Result<Vec<CommitMatch>, GitHubError> {
            Ok(self.commit_matches.clone())
        }
    }

    fn item(id: u64) -> ChainItem {
        ChainItem::new(Repository {
            id,
            name: format!("repo{id}"),
            full_name: format!("octo/repo{id}"),
            html_url: None,
            clone_url: Some(format!("https://github.com/octo/repo{id}.git")),
            default_branch: None,
            stargazers_count: None,
            language: None,
        })
    }

    fn item_with_clone(id: u64, path: &std::path::Path) -> ChainItem {
        let mut item = item(id);
        item.set_property(
            "clone",
            json!({ "valid": true, "full_path": path.to_string_lossy() }),
        );
        item
    }

    #[tokio::test]
    async fn test_check_file_vetoes_without_matches() {
        let task = CheckFileTask::new(
            "readme",
            FileQuery {
                filename: Some("README.md".to_string()),
                ..Default::default()
            },
            false,
            StubBackend::empty(),
        );

        let outcome = task.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Discard);
        assert_eq!(
            outcome.item.property("readme"),
            Some(&json!({ "valid": false, "files": [] }))
        );
    }

    #[tokio::test]
    async fn test_check_file_optional_continues_with_invalid_property() {
        let task = CheckFileTask::new(
            "readme",
            FileQuery::default(),
            true,
            StubBackend::empty(),
        );

        let outcome = task.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Continue);
        assert_eq!(outcome.item.property("readme").unwrap()["valid"], json!(false));
    }

    #[tokio::test]
    async fn test_check_file_records_matches() {
        let backend = StubBackend::with_files(&[("main.go", "cmd/main.go")]);
        let task = CheckFileTask::new("gofiles", FileQuery::default(), false, backend);

        let outcome = task.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Continue);
        let property = outcome.item.property("gofiles").unwrap();
        assert_eq!(property["valid"], json!(true));
        assert_eq!(property["files"][0]["path"], json!("cmd/main.go"));
    }

    #[tokio::test]
    async fn test_check_commit_vetoes_without_matches() {
        let task = CheckCommitTask::new(
            "fixes",
            CommitQuery {
                message: Some("fix".to_string()),
                ..Default::default()
            },
            false,
            StubBackend::empty(),
        );

        let outcome = task.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Discard);
        assert_eq!(outcome.item.property("fixes").unwrap()["valid"], json!(false));
    }

    #[tokio::test]
    async fn test_clone_failure_never_vetoes() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("git").returns_exit_code(128).finish();

        let dest = tempfile::tempdir().unwrap();
        let task = CloneTask::new(dest.path(), subprocess);
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.decision, Decision::Continue);
        let property = outcome.item.property("clone").unwrap();
        assert_eq!(property["valid"], json!(false));
        assert!(property["error"].as_str().unwrap().contains("128"));
        assert!(outcome.item.clone_path().is_none());
    }

    #[tokio::test]
    async fn test_clone_records_full_path() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("git").returns_success().finish();

        let dest = tempfile::tempdir().unwrap();
        let task = CloneTask::new(dest.path(), subprocess);
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.decision, Decision::Continue);
        let expected = dest.path().join("octo_repo1");
        assert_eq!(outcome.item.clone_path(), Some(expected));
        assert!(mock.verify_called("git", 1));
    }

    #[tokio::test]
    async fn test_clone_reuses_existing_directory() {
        let (subprocess, mock) = SubprocessManager::mock();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join("octo_repo1")).unwrap();

        let task = CloneTask::new(dest.path(), subprocess);
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.item.property("clone").unwrap()["valid"], json!(true));
        assert!(mock.verify_called("git", 0));
    }

    #[tokio::test]
    async fn test_check_property_only_records_when_named() {
        let named = CheckPropertyTask::new(
            Box::new(|item| item.repo.id > 0),
            Some("has_id"),
        );
        let outcome = named.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Continue);
        assert_eq!(outcome.item.property("has_id").unwrap()["valid"], json!(true));

        let unnamed = CheckPropertyTask::new(Box::new(|_| false), None);
        let outcome = unnamed.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Discard);
        assert!(outcome.item.properties.is_empty());
    }

    #[tokio::test]
    async fn test_check_command_default_condition_is_no_error() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh").returns_exit_code(2).finish();

        let task = CheckCommandTask::new(
            "build",
            Box::new(|_| "make build".to_string()),
            default_condition(),
            false,
            subprocess,
        );
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.decision, Decision::Discard);
        assert_eq!(outcome.item.property("build").unwrap()["valid"], json!(false));
    }

    #[tokio::test]
    async fn test_check_command_optional_continues_on_failure() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh").returns_exit_code(1).finish();

        let task = CheckCommandTask::new(
            "build",
            Box::new(|_| "make build".to_string()),
            default_condition(),
            true,
            subprocess,
        );
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.decision, Decision::Continue);
        assert_eq!(outcome.item.property("build").unwrap()["valid"], json!(false));
    }

    #[tokio::test]
    async fn test_check_command_custom_condition_sees_output() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh")
            .returns_stdout("3 tests passed\n")
            .returns_success()
            .finish();

        let task = CheckCommandTask::new(
            "tests",
            Box::new(|_| "go test ./...".to_string()),
            Box::new(|result| result.stdout.contains("passed")),
            false,
            subprocess,
        );
        let outcome = task.apply(item(1), None).await.unwrap();
        assert_eq!(outcome.decision, Decision::Continue);
    }

    #[tokio::test]
    async fn test_check_command_runs_in_clone_directory() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh").returns_success().finish();

        let clone = tempfile::tempdir().unwrap();
        let task = CheckCommandTask::new(
            "build",
            Box::new(|_| "make".to_string()),
            default_condition(),
            false,
            subprocess,
        );
        task.apply(item_with_clone(1, clone.path()), None)
            .await
            .unwrap();

        let history = mock.get_call_history();
        assert_eq!(history[0].working_dir.as_deref(), Some(clone.path()));
        assert_eq!(history[0].args, vec!["-c", "make"]);
    }

    #[tokio::test]
    async fn test_command_on_files_runs_once_per_distinct_folder() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh").returns_success().finish();

        let clone = tempfile::tempdir().unwrap();
        let mut input = item_with_clone(1, clone.path());
        input.set_property(
            "gofiles",
            json!({
                "valid": true,
                "files": [
                    { "name": "a.go", "path": "src/a.go" },
                    { "name": "b.go", "path": "src/b.go" }
                ]
            }),
        );

        let task = CheckCommandOnFilesTask::new(
            "builds",
            "gofiles",
            "go build",
            default_condition(),
            false,
            subprocess,
        );
        let outcome = task.apply(input, None).await.unwrap();

        // Both files share src/, so the command ran exactly once.
        assert!(mock.verify_called("sh", 1));
        let property = outcome.item.property("builds").unwrap();
        assert_eq!(property["valid"], json!(true));
        assert_eq!(property["valid_folders"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_command_on_files_collects_passing_folders() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("sh").returns_success().finish();

        let clone = tempfile::tempdir().unwrap();
        let mut input = item_with_clone(1, clone.path());
        input.set_property(
            "gofiles",
            json!({
                "valid": true,
                "files": [
                    { "name": "a.go", "path": "cmd/a.go" },
                    { "name": "b.go", "path": "pkg/b.go" },
                    { "name": "c.go", "path": "root.go" }
                ]
            }),
        );

        let task = CheckCommandOnFilesTask::new(
            "builds",
            "gofiles",
            "go build",
            default_condition(),
            false,
            subprocess,
        );
        let outcome = task.apply(input, None).await.unwrap();

        assert!(mock.verify_called("sh", 3));
        let folders = outcome.item.property("builds").unwrap()["valid_folders"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(folders.len(), 3);
    }

    #[tokio::test]
    async fn test_check_loc_default_threshold_always_passes() {
        let clone = tempfile::tempdir().unwrap();
        let task = CheckLocTask::new(
            "loc",
            ".go",
            AncestorFilter::Include(Vec::new()),
            -1,
            false,
        );
        let outcome = task
            .apply(item_with_clone(1, clone.path()), None)
            .await
            .unwrap();

        assert_eq!(outcome.decision, Decision::Continue);
        assert_eq!(
            outcome.item.property("loc"),
            Some(&json!({ "valid": true, "loc": 0 }))
        );
    }

    #[tokio::test]
    async fn test_check_loc_exclude_skips_vendored_code() {
        let clone = tempfile::tempdir().unwrap();
        fs::create_dir_all(clone.path().join("src")).unwrap();
        fs::create_dir_all(clone.path().join("vendor")).unwrap();
        fs::write(clone.path().join("src/a.go"), "a\nb\n").unwrap();
        fs::write(clone.path().join("vendor/b.go"), "x\ny\nz\n").unwrap();

        let task = CheckLocTask::new(
            "loc",
            ".go",
            AncestorFilter::Exclude {
                parents: Vec::new(),
                exclude: vec!["vendor".to_string()],
            },
            1,
            false,
        );
        let outcome = task
            .apply(item_with_clone(1, clone.path()), None)
            .await
            .unwrap();

        assert_eq!(
            outcome.item.property("loc"),
            Some(&json!({ "valid": true, "loc": 2 }))
        );
    }

    #[tokio::test]
    async fn test_check_loc_without_clone_path_is_a_failed_check() {
        let task = CheckLocTask::new(
            "loc",
            ".go",
            AncestorFilter::Include(Vec::new()),
            -1,
            false,
        );
        let outcome = task.apply(item(1), None).await.unwrap();

        assert_eq!(outcome.decision, Decision::Discard);
        assert_eq!(
            outcome.item.property("loc"),
            Some(&json!({ "valid": false, "loc": 0 }))
        );
    }

    #[tokio::test]
    async fn test_check_loc_below_threshold_vetoes() {
        let clone = tempfile::tempdir().unwrap();
        fs::write(clone.path().join("a.go"), "one\n").unwrap();

        let task = CheckLocTask::new(
            "loc",
            ".go",
            AncestorFilter::Include(Vec::new()),
            10,
            false,
        );
        let outcome = task
            .apply(item_with_clone(1, clone.path()), None)
            .await
            .unwrap();

        assert_eq!(outcome.decision, Decision::Discard);
        assert_eq!(outcome.item.property("loc").unwrap()["valid"], json!(false));
    }

    /// A chain rejecting at a non-optional existence check stops before the
    /// clone step, so the clone side effect must never happen.
    #[tokio::test]
    async fn test_rejecting_existence_check_skips_clone() {
        let (subprocess, mock) = SubprocessManager::mock();
        let state = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let input = tempfile::tempdir().unwrap();
        let items_path = input.path().join("items.json");
        fs::write(&items_path, serde_json::to_string(&vec![item(1)]).unwrap()).unwrap();

        let summary = ChainBuilder::file(
            "scenario",
            &items_path,
            StubBackend::empty(),
            subprocess,
        )
        .state_dir(state.path())
        .results_dir(results.path())
        .check_file(
            FileQuery {
                filename: Some("README.md".to_string()),
                ..Default::default()
            },
            "existence",
            false,
        )
        .clone_to(results.path().join("tmp"))
        .check_loc(Vec::new(), ".go", "line_count", 100, false)
        .run()
        .await
        .unwrap();

        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.rejected, 1);
        assert!(mock.verify_called("git", 0));

        let persisted = fs::read_to_string(results.path().join("results_scenario.json")).unwrap();
        assert_eq!(persisted.trim(), "{}");
    }

    /// With the existence check optional and 150 matching lines on disk, the
    /// item is accepted with all three properties recorded.
    #[tokio::test]
    async fn test_optional_existence_with_enough_lines_is_accepted() {
        let (subprocess, _mock) = SubprocessManager::mock();
        let state = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let input = tempfile::tempdir().unwrap();
        let items_path = input.path().join("items.json");
        fs::write(&items_path, serde_json::to_string(&vec![item(1)]).unwrap()).unwrap();

        // The clone target already exists, holding 150 lines of Go.
        let dest = results.path().join("tmp");
        let checkout = dest.join("octo_repo1");
        fs::create_dir_all(&checkout).unwrap();
        let body = "package main\n".repeat(150);
        fs::write(checkout.join("main.go"), body).unwrap();

        let summary = ChainBuilder::file(
            "scenario",
            &items_path,
            StubBackend::empty(),
            subprocess,
        )
        .state_dir(state.path())
        .results_dir(results.path())
        .check_file(
            FileQuery {
                filename: Some("README.md".to_string()),
                ..Default::default()
            },
            "existence",
            true,
        )
        .clone_to(&dest)
        .check_loc(Vec::new(), ".go", "line_count", 100, false)
        .run()
        .await
        .unwrap();

        assert_eq!(summary.accepted, 1);

        let persisted = fs::read_to_string(results.path().join("results_scenario.json")).unwrap();
        let collection: serde_json::Value = serde_json::from_str(&persisted).unwrap();
        let record = &collection["1"];
        assert_eq!(record["existence"], json!({ "valid": false, "files": [] }));
        assert_eq!(record["clone"]["valid"], json!(true));
        assert_eq!(record["line_count"], json!({ "valid": true, "loc": 150 }));
    }
}
