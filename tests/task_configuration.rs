// tests/task_configuration.rs

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use taskexec::errors::ConfigurationError;
use taskexec::io::{IoAttachment, ProcessIo};
use taskexec::task::{DEFAULT_GRACE_PERIOD, TaskConfiguration};
use taskexec_test_utils::doubles::RecordingLogger;

type TestResult = Result<(), Box<dyn Error>>;

fn io() -> Arc<dyn IoAttachment> {
    Arc::new(ProcessIo::default())
}

#[test]
fn new_rejects_blank_launch_path() {
    for path in ["", "   "] {
        let err = TaskConfiguration::new(path, vec![], BTreeMap::new(), None, io(), None, "prog")
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyLaunchPath);
    }
}

#[test]
fn new_rejects_blank_program_name() {
    let err = TaskConfiguration::new("/bin/true", vec![], BTreeMap::new(), None, io(), None, " ")
        .unwrap_err();
    assert_eq!(err, ConfigurationError::EmptyProgramName);
}

#[test]
fn new_rejects_empty_acceptable_exit_codes() {
    let err = TaskConfiguration::new(
        "/bin/true",
        vec![],
        BTreeMap::new(),
        Some(BTreeSet::new()),
        io(),
        None,
        "true",
    )
    .unwrap_err();
    assert_eq!(err, ConfigurationError::EmptyAcceptableExitCodes);
}

#[test]
fn builder_rejects_zero_grace_period() {
    let err = TaskConfiguration::builder("/bin/true")
        .grace_period(Duration::ZERO)
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::ZeroGracePeriod);
}

#[test]
fn new_keeps_every_field() -> TestResult {
    let env = BTreeMap::from([("LANG".to_string(), "C".to_string())]);
    let codes = BTreeSet::from([0, 2]);
    let cfg = TaskConfiguration::new(
        "/bin/ls",
        vec!["-l".into(), "/tmp".into()],
        env.clone(),
        Some(codes.clone()),
        io(),
        None,
        "lister",
    )?;

    assert_eq!(cfg.launch_path(), "/bin/ls");
    assert_eq!(cfg.arguments(), ["-l", "/tmp"]);
    assert_eq!(cfg.environment(), &env);
    assert_eq!(cfg.acceptable_exit_codes(), Some(&codes));
    assert_eq!(cfg.program_name(), "lister");
    assert!(cfg.logger().is_none());
    assert!(cfg.working_directory().is_none());
    assert_eq!(cfg.grace_period(), DEFAULT_GRACE_PERIOD);
    Ok(())
}

#[test]
fn builder_defaults_program_name_to_file_name() -> TestResult {
    let cfg = TaskConfiguration::builder("/usr/bin/env").build()?;
    assert_eq!(cfg.program_name(), "env");
    assert!(cfg.acceptable_exit_codes().is_none());
    assert!(cfg.environment().is_empty());
    Ok(())
}

#[test]
fn builder_env_and_codes() -> TestResult {
    let cfg = TaskConfiguration::builder("/bin/sh")
        .env("A", "1")
        .envs([("B", "2"), ("A", "3")])
        .acceptable_exit_codes([0, 1])
        .build()?;

    assert_eq!(cfg.environment().get("A").map(String::as_str), Some("3"));
    assert_eq!(cfg.environment().get("B").map(String::as_str), Some("2"));
    assert_eq!(cfg.acceptable_exit_codes(), Some(&BTreeSet::from([0, 1])));

    let any = TaskConfiguration::builder("/bin/sh")
        .acceptable_exit_codes([0])
        .any_exit_code()
        .build()?;
    assert!(any.acceptable_exit_codes().is_none());
    Ok(())
}

#[test]
fn inherit_environment_keeps_explicit_values() -> TestResult {
    let cfg = TaskConfiguration::builder("/bin/sh")
        .env("PATH", "/only/here")
        .inherit_environment()
        .build()?;

    assert_eq!(cfg.environment().get("PATH").map(String::as_str), Some("/only/here"));
    // Cargo sets this for every test binary it runs.
    assert!(cfg.environment().contains_key("CARGO_MANIFEST_DIR"));
    Ok(())
}

#[test]
fn equality_is_structural_for_data_and_identity_for_collaborators() -> TestResult {
    let shared_io = io();
    let logger = RecordingLogger::new();

    let a = TaskConfiguration::builder("/bin/echo")
        .arg("hi")
        .io(shared_io.clone())
        .logger(logger.clone())
        .build()?;
    let b = TaskConfiguration::builder("/bin/echo")
        .arg("hi")
        .io(shared_io.clone())
        .logger(logger)
        .build()?;
    assert_eq!(a, b);
    assert_eq!(a, a.clone());

    let other_io = TaskConfiguration::builder("/bin/echo")
        .arg("hi")
        .io(io())
        .build()?;
    assert_ne!(a, other_io);

    let other_args = TaskConfiguration::builder("/bin/echo")
        .arg("bye")
        .io(shared_io)
        .build()?;
    assert_ne!(a, other_args);
    Ok(())
}

#[test]
fn display_describes_the_task() -> TestResult {
    let cfg = TaskConfiguration::builder("/bin/ls")
        .program_name("lister")
        .arg("-l")
        .env("LANG", "C")
        .acceptable_exit_codes([0])
        .build()?;

    let text = cfg.to_string();
    assert!(text.contains("lister"));
    assert!(text.contains("/bin/ls"));
    assert!(text.contains("\"-l\""));
    assert!(text.contains("LANG"));
    assert!(text.contains("acceptable exit codes {0}"));
    Ok(())
}
