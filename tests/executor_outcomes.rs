// tests/executor_outcomes.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use taskexec::exec::{FailureKind, Outcome, TaskExecutor};
use taskexec::io::{OutputMode, ProcessIo, StreamKind};
use taskexec::task::TaskConfiguration;
use taskexec::types::TaskState;
use taskexec_test_utils::builders::{sh, sh_task};
use taskexec_test_utils::doubles::{CountingIo, PanickingLogger, RecordingLogger};
use taskexec_test_utils::{TestResult, init_tracing, with_timeout};

#[tokio::test]
async fn exit_zero_with_zero_accepted_completes() -> TestResult {
    with_timeout(async {
        init_tracing();

        let cfg = sh("exit 0").acceptable_exit_codes([0]).build()?;
        let handle = TaskExecutor::new().start(cfg).await;
        assert!(handle.pid().is_some());

        let outcome = handle.wait().await;
        assert_eq!(outcome, Outcome::Success { exit_code: 0 });
        assert_eq!(handle.state(), TaskState::Completed);
        assert_eq!(handle.outcome(), Some(outcome));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn exit_code_outside_policy_fails() -> TestResult {
    with_timeout(async {
        init_tracing();

        let cfg = sh("exit 1").acceptable_exit_codes([0]).build()?;
        let handle = TaskExecutor::new().start(cfg).await;
        let outcome = handle.wait().await;

        let failure = outcome.failure().expect("exit 1 must fail");
        assert_eq!(failure.kind, FailureKind::ExitCodePolicy);
        assert_eq!(failure.code_or_signal, Some(1));
        assert!(failure.message.contains("exited with code 1"));
        assert_eq!(handle.state(), TaskState::Failed);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn no_policy_accepts_any_exit_code() -> TestResult {
    with_timeout(async {
        init_tracing();

        let outcome = TaskExecutor::new().run(sh_task("exit 17"), None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 17 });
        assert_eq!(outcome.into_result(), Ok(17));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn nonzero_code_in_policy_completes() -> TestResult {
    with_timeout(async {
        init_tracing();

        let cfg = sh("exit 3").acceptable_exit_codes([0, 3]).build()?;
        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 3 });
        Ok(())
    })
    .await
}

#[cfg(unix)]
#[tokio::test]
async fn signal_death_fails_regardless_of_policy() -> TestResult {
    with_timeout(async {
        init_tracing();

        for cfg in [
            sh("kill -9 $$").build()?,
            sh("kill -9 $$").acceptable_exit_codes([0, 9, 137]).build()?,
        ] {
            let handle = TaskExecutor::new().start(cfg).await;
            let outcome = handle.wait().await;

            assert_eq!(outcome.failure_kind(), Some(FailureKind::SignalTermination));
            assert_eq!(outcome.code_or_signal(), Some(9));
            assert_eq!(handle.state(), TaskState::Failed);
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_executable_is_a_launch_failure() -> TestResult {
    with_timeout(async {
        init_tracing();

        let counting = CountingIo::new(ProcessIo::default());
        let cfg = TaskConfiguration::builder("/definitely/not/here/taskexec-missing")
            .io(counting.clone())
            .build()?;

        let handle = TaskExecutor::new().start(cfg).await;
        assert!(handle.pid().is_none());
        assert_eq!(handle.state(), TaskState::Failed);

        let outcome = handle.wait().await;
        let failure = outcome.failure().expect("launch must fail");
        assert_eq!(failure.kind, FailureKind::Launch);
        assert_eq!(failure.code_or_signal, Some(2)); // ENOENT
        assert!(failure.message.contains("taskexec-missing"));

        assert_eq!(counting.attach_count(), 1);
        assert_eq!(counting.connect_count(), 0);
        assert_eq!(counting.release_count(), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unreadable_stdin_file_is_a_launch_failure() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let io = ProcessIo::default()
            .with_stdin(taskexec::io::InputMode::File(dir.path().join("absent.txt")));
        let cfg = sh("cat").io(Arc::new(io)).build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Launch));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn environment_is_exactly_the_configured_one() -> TestResult {
    with_timeout(async {
        init_tracing();

        // CARGO_MANIFEST_DIR is set for this test process but must not leak.
        let cfg = sh(r#"[ -z "$CARGO_MANIFEST_DIR" ] && [ "$GREETING" = "hello world" ]"#)
            .env("GREETING", "hello world")
            .acceptable_exit_codes([0])
            .build()?;
        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 0 });

        let inherited = sh(r#"[ -n "$CARGO_MANIFEST_DIR" ]"#)
            .inherit_environment()
            .acceptable_exit_codes([0])
            .build()?;
        let outcome = TaskExecutor::new().run(inherited, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 0 });
        Ok(())
    })
    .await
}

#[tokio::test]
async fn arguments_are_passed_verbatim() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let io = ProcessIo::discard().with_stdout(OutputMode::Channel(tx));
        let cfg = sh(r#"printf '%s|' "$@""#)
            .args(["argv0", "two words", "$NOT_EXPANDED", ""])
            .io(Arc::new(io))
            .build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert!(outcome.is_success());

        let line = rx.recv().await.expect("one line of output");
        assert_eq!(line.line, "two words|$NOT_EXPANDED||");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn working_directory_is_applied() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("marker.txt"), "x")?;

        let cfg = sh("test -f marker.txt")
            .working_directory(dir.path())
            .acceptable_exit_codes([0])
            .build()?;
        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 0 });
        Ok(())
    })
    .await
}

#[tokio::test]
async fn channel_output_delivers_both_streams() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let io = ProcessIo::discard()
            .with_stdout(OutputMode::Channel(tx.clone()))
            .with_stderr(OutputMode::Channel(tx));
        let cfg = sh("echo out-line; echo err-line 1>&2").io(Arc::new(io)).build()?;

        let handle = TaskExecutor::new().start(cfg).await;
        handle.wait().await;

        // Streams are drained before the terminal state is published.
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push((line.stream, line.line));
        }
        assert!(lines.contains(&(StreamKind::Stdout, "out-line".to_string())));
        assert!(lines.contains(&(StreamKind::Stderr, "err-line".to_string())));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn invalid_utf8_output_is_read_to_the_end() -> TestResult {
    with_timeout(async {
        init_tracing();

        // More than a pipe buffer follows the bad line, so a reader that gave
        // up early would leave the shell blocked or killed by SIGPIPE.
        let script = r#"printf '\377\n'
i=0
while [ $i -lt 3000 ]; do echo 0123456789012345678901234567890; i=$((i+1)); done
exit 0"#;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let io = ProcessIo::discard().with_stdout(OutputMode::Channel(tx));
        let cfg = sh(script)
            .io(Arc::new(io))
            .acceptable_exit_codes([0])
            .build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 0 });

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.line);
        }
        assert_eq!(lines.len(), 3001);
        assert_eq!(lines[0], "\u{FFFD}");
        assert_eq!(lines[3000], "0123456789012345678901234567890");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn crlf_and_unterminated_lines_are_forwarded() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let io = ProcessIo::discard().with_stdout(OutputMode::Channel(tx));
        let cfg = sh(r#"printf 'dos\r\nlast'"#).io(Arc::new(io)).build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert!(outcome.is_success());

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.line);
        }
        assert_eq!(lines, ["dos", "last"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn file_output_is_written() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");
        let io = ProcessIo::discard().with_stdout(OutputMode::File(out.clone()));
        let cfg = sh("echo to-file").io(Arc::new(io)).build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert!(outcome.is_success());
        assert_eq!(std::fs::read_to_string(out)?, "to-file\n");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn logger_sees_launch_output_and_outcome() -> TestResult {
    with_timeout(async {
        init_tracing();

        let logger = RecordingLogger::new();
        let io = ProcessIo::discard().with_stdout(OutputMode::Log);
        let cfg = sh("echo logged-line")
            .io(Arc::new(io))
            .logger(logger.clone())
            .build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert!(outcome.is_success());

        assert!(logger.contains("launching sh-test"));
        assert!(logger.contains("sh-test stdout: logged-line"));
        assert!(logger.contains("success (exit code 0)"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn panicking_logger_does_not_change_the_outcome() -> TestResult {
    with_timeout(async {
        init_tracing();

        let io = ProcessIo::discard().with_stdout(OutputMode::Log);
        let cfg = sh("echo boom; exit 4")
            .io(Arc::new(io))
            .logger(Arc::new(PanickingLogger))
            .acceptable_exit_codes([4])
            .build()?;

        let outcome = TaskExecutor::new().run(cfg, None).await;
        assert_eq!(outcome, Outcome::Success { exit_code: 4 });

        let failed = TaskConfiguration::builder("/definitely/not/here")
            .logger(Arc::new(PanickingLogger))
            .build()?;
        let outcome = TaskExecutor::new().run(failed, None).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Launch));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn release_happens_once_on_success_and_failure() -> TestResult {
    with_timeout(async {
        init_tracing();

        for (script, success) in [("exit 0", true), ("exit 5", false)] {
            let counting = CountingIo::new(ProcessIo::discard());
            let cfg = sh(script)
                .io(counting.clone())
                .acceptable_exit_codes([0])
                .build()?;

            let handle = TaskExecutor::new().start(cfg).await;
            let outcome = handle.wait().await;
            assert_eq!(outcome.is_success(), success);

            // Waiting again returns the same outcome without new releases.
            assert_eq!(handle.wait().await, outcome);
            assert_eq!(counting.attach_count(), 1);
            assert_eq!(counting.connect_count(), 1);
            assert_eq!(counting.release_count(), 1);
        }
        Ok(())
    })
    .await
}
