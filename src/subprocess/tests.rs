#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_production_runner_success() {
        let runner = runner::TokioProcessRunner;
        let command = ProcessCommandBuilder::new("echo")
            .arg("hello world")
            .build();

        let output = runner.run(command).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_production_runner_failure() {
        let runner = runner::TokioProcessRunner;
        let command = ProcessCommandBuilder::new("false").build();

        let output = runner.run(command).await.unwrap();
        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(1));
    }

    #[tokio::test]
    async fn test_production_runner_command_not_found() {
        let runner = runner::TokioProcessRunner;
        let command = ProcessCommandBuilder::new("nonexistent-command-12345").build();

        let result = runner.run(command).await;
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ProcessError::CommandNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_production_runner_timeout() {
        let runner = runner::TokioProcessRunner;
        let command = ProcessCommandBuilder::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .build();

        let result = runner.run(command).await;
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ProcessError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_production_runner_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner::TokioProcessRunner;
        let command = ProcessCommandBuilder::new("pwd")
            .current_dir(dir.path())
            .build();

        let output = runner.run(command).await.unwrap();
        assert!(output.status.success());
        assert!(output
            .stdout
            .trim()
            .ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_mock_runner_basic() {
        let mut mock = MockProcessRunner::new();

        mock.expect_command("git")
            .with_args(|args| args == &["status"])
            .returns_stdout("On branch main\n")
            .returns_success()
            .finish();

        let output = mock
            .run(ProcessCommandBuilder::new("git").arg("status").build())
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout, "On branch main\n");
        assert!(mock.verify_called("git", 1));
    }

    #[tokio::test]
    async fn test_mock_runner_limited_calls() {
        let mut mock = MockProcessRunner::new();

        mock.expect_command("make")
            .returns_success()
            .times(1)
            .finish();

        let first = mock.run(ProcessCommandBuilder::new("make").build()).await;
        assert!(first.is_ok());

        let second = mock.run(ProcessCommandBuilder::new("make").build()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_git_runner_clone() {
        let (manager, mut mock) = SubprocessManager::mock();

        mock.expect_command("git")
            .with_args(|args| args.first().map(String::as_str) == Some("clone"))
            .returns_success()
            .finish();

        let git = manager.git();
        git.clone_repository(
            "https://github.com/octo/spoon.git",
            std::path::Path::new("./tmp/octo_spoon"),
        )
        .await
        .unwrap();

        let history = mock.get_call_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].args[..3], ["clone", "--depth", "1"]);
    }

    #[tokio::test]
    async fn test_git_runner_clone_failure() {
        let (manager, mut mock) = SubprocessManager::mock();

        mock.expect_command("git").returns_exit_code(128).finish();

        let result = manager
            .git()
            .clone_repository("https://github.com/octo/gone.git", std::path::Path::new("./tmp/x"))
            .await;

        assert!(matches!(result.unwrap_err(), ProcessError::ExitCode(128)));
    }

    #[test]
    fn test_shell_builder() {
        let command = ProcessCommandBuilder::shell("go build ./...").build();
        assert_eq!(command.program, "sh");
        assert_eq!(command.args, vec!["-c", "go build ./..."]);
    }

    #[tokio::test]
    async fn test_process_command_builder() {
        let command = ProcessCommandBuilder::new("test")
            .arg("arg1")
            .args(["arg2", "arg3"])
            .env("KEY1", "value1")
            .current_dir(std::path::Path::new("/tmp"))
            .timeout(Duration::from_secs(30))
            .build();

        assert_eq!(command.program, "test");
        assert_eq!(command.args, vec!["arg1", "arg2", "arg3"]);
        assert_eq!(command.env.get("KEY1"), Some(&"value1".to_string()));
        assert_eq!(command.working_dir, Some(std::path::PathBuf::from("/tmp")));
        assert_eq!(command.timeout, Some(Duration::from_secs(30)));
    }
}
