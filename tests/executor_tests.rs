use std::time::{Duration, Instant};

use sysgpio::{CommandExecutor, CommandResult};

#[tokio::test]
async fn silent_success_is_empty_output() {
    let executor = CommandExecutor::default();

    assert_eq!(executor.run("true").await, CommandResult::Success(String::new()));
    assert_eq!(
        executor.run("printf '  \\n'").await,
        CommandResult::Success(String::new())
    );
}

#[tokio::test]
async fn output_keeps_text_without_final_newline() {
    let executor = CommandExecutor::default();

    assert_eq!(
        executor.run("echo hello").await,
        CommandResult::Success("hello".into())
    );
    assert_eq!(
        executor.run("printf 'a\\nb\\n'").await.output(),
        Some("a\nb")
    );
}

#[tokio::test]
async fn non_zero_exit_is_failure() {
    let executor = CommandExecutor::default();

    assert_eq!(executor.run("exit 3").await, CommandResult::Failure);
    assert_eq!(
        executor.run("echo oops >&2; exit 1").await,
        CommandResult::Failure
    );
    assert!(!executor.run("cat /nonexistent/sysgpio/value").await.is_success());
}

#[tokio::test]
async fn hanging_command_times_out() {
    let executor = CommandExecutor::new(Duration::from_millis(200));

    let start = Instant::now();
    let result = executor.run("sleep 10").await;

    assert_eq!(result, CommandResult::Failure);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn timed_out_command_is_killed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("marker");
    let executor = CommandExecutor::default();

    let cmd = format!("sleep 1; touch '{}'", marker.display());
    let result = executor
        .run_with_timeout(&cmd, Duration::from_millis(100))
        .await;
    assert_eq!(result, CommandResult::Failure);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn timeout_kills_background_descendants() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("marker");
    let executor = CommandExecutor::default();

    // the subshell outlives `sh` unless the whole process group is signalled
    let cmd = format!("(sleep 1; touch '{}') & wait", marker.display());
    let result = executor
        .run_with_timeout(&cmd, Duration::from_millis(100))
        .await;
    assert_eq!(result, CommandResult::Failure);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let executor = CommandExecutor::default();

    let (a, b, c) = tokio::join!(
        executor.run("sleep 0.1; echo a"),
        executor.run("echo b"),
        executor.run("exit 1"),
    );

    assert_eq!(a, CommandResult::Success("a".into()));
    assert_eq!(b, CommandResult::Success("b".into()));
    assert_eq!(c, CommandResult::Failure);
}
