// src/task/configuration.rs

//! Immutable description of a task process.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ConfigurationError;
use crate::io::{IoAttachment, ProcessIo};
use crate::logger::TaskLogger;

/// Grace period between the termination signal and the forceful kill when a
/// task is stopped, unless configured otherwise.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Everything needed to start a process and judge how it ended.
///
/// Fields are private and only reachable through accessors, so a value that
/// exists has passed validation and never changes. Cloning is cheap: the I/O
/// attachment and logger are shared.
///
/// Equality compares the plain data fields structurally and the I/O
/// attachment and logger by identity.
#[derive(Debug, Clone)]
pub struct TaskConfiguration {
    launch_path: String,
    arguments: Vec<String>,
    environment: BTreeMap<String, String>,
    acceptable_exit_codes: Option<BTreeSet<i32>>,
    io: Arc<dyn IoAttachment>,
    logger: Option<Arc<dyn TaskLogger>>,
    program_name: String,
    working_directory: Option<PathBuf>,
    grace_period: Duration,
}

impl TaskConfiguration {
    /// Create a configuration from its parts.
    ///
    /// Fails if `launch_path` or `program_name` is blank, or if
    /// `acceptable_exit_codes` is `Some` but empty.
    pub fn new(
        launch_path: impl Into<String>,
        arguments: Vec<String>,
        environment: BTreeMap<String, String>,
        acceptable_exit_codes: Option<BTreeSet<i32>>,
        io: Arc<dyn IoAttachment>,
        logger: Option<Arc<dyn TaskLogger>>,
        program_name: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let config = Self {
            launch_path: launch_path.into(),
            arguments,
            environment,
            acceptable_exit_codes,
            io,
            logger,
            program_name: program_name.into(),
            working_directory: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        };
        config.validate()?;
        Ok(config)
    }

    /// Start a builder for the given executable.
    pub fn builder(launch_path: impl Into<String>) -> TaskConfigurationBuilder {
        TaskConfigurationBuilder::new(launch_path)
    }

    /// Check every construction invariant.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.launch_path.trim().is_empty() {
            return Err(ConfigurationError::EmptyLaunchPath);
        }
        if self.program_name.trim().is_empty() {
            return Err(ConfigurationError::EmptyProgramName);
        }
        if matches!(&self.acceptable_exit_codes, Some(codes) if codes.is_empty()) {
            return Err(ConfigurationError::EmptyAcceptableExitCodes);
        }
        if self.grace_period.is_zero() {
            return Err(ConfigurationError::ZeroGracePeriod);
        }
        Ok(())
    }

    pub fn launch_path(&self) -> &str {
        &self.launch_path
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// `None` means any exit code is accepted.
    pub fn acceptable_exit_codes(&self) -> Option<&BTreeSet<i32>> {
        self.acceptable_exit_codes.as_ref()
    }

    pub fn io(&self) -> &Arc<dyn IoAttachment> {
        &self.io
    }

    pub fn logger(&self) -> Option<&Arc<dyn TaskLogger>> {
        self.logger.as_ref()
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }
}

impl PartialEq for TaskConfiguration {
    fn eq(&self, other: &Self) -> bool {
        let same_logger = match (&self.logger, &other.logger) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };

        self.launch_path == other.launch_path
            && self.arguments == other.arguments
            && self.environment == other.environment
            && self.acceptable_exit_codes == other.acceptable_exit_codes
            && self.program_name == other.program_name
            && self.working_directory == other.working_directory
            && self.grace_period == other.grace_period
            && Arc::ptr_eq(&self.io, &other.io)
            && same_logger
    }
}

impl fmt::Display for TaskConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.program_name, self.launch_path)?;
        for arg in &self.arguments {
            write!(f, " {arg:?}")?;
        }
        if !self.environment.is_empty() {
            let keys: Vec<_> = self.environment.keys().map(String::as_str).collect();
            write!(f, " | env [{}]", keys.join(", "))?;
        }
        if let Some(dir) = &self.working_directory {
            write!(f, " | cwd {}", dir.display())?;
        }
        match &self.acceptable_exit_codes {
            Some(codes) => write!(f, " | acceptable exit codes {codes:?}"),
            None => write!(f, " | any exit code"),
        }
    }
}

/// Fluent construction of a [`TaskConfiguration`].
#[derive(Debug, Clone)]
pub struct TaskConfigurationBuilder {
    launch_path: String,
    arguments: Vec<String>,
    environment: BTreeMap<String, String>,
    acceptable_exit_codes: Option<BTreeSet<i32>>,
    io: Option<Arc<dyn IoAttachment>>,
    logger: Option<Arc<dyn TaskLogger>>,
    program_name: Option<String>,
    working_directory: Option<PathBuf>,
    grace_period: Duration,
}

impl TaskConfigurationBuilder {
    pub fn new(launch_path: impl Into<String>) -> Self {
        Self {
            launch_path: launch_path.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            acceptable_exit_codes: None,
            io: None,
            logger: None,
            program_name: None,
            working_directory: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable, replacing any earlier value.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Copy the current process environment into the task environment.
    ///
    /// Variables already set on the builder keep their values. Variables that
    /// are not valid UTF-8 are skipped.
    pub fn inherit_environment(mut self) -> Self {
        for (key, value) in std::env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                self.environment
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        self
    }

    pub fn acceptable_exit_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        self.acceptable_exit_codes = Some(codes.into_iter().collect());
        self
    }

    /// Accept any exit code (the default).
    pub fn any_exit_code(mut self) -> Self {
        self.acceptable_exit_codes = None;
        self
    }

    pub fn io(mut self, io: Arc<dyn IoAttachment>) -> Self {
        self.io = Some(io);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn TaskLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Display name used in logs and errors. Defaults to the file name of
    /// the launch path.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn build(self) -> Result<TaskConfiguration, ConfigurationError> {
        let program_name = self
            .program_name
            .unwrap_or_else(|| default_program_name(&self.launch_path));

        let config = TaskConfiguration {
            launch_path: self.launch_path,
            arguments: self.arguments,
            environment: self.environment,
            acceptable_exit_codes: self.acceptable_exit_codes,
            io: self
                .io
                .unwrap_or_else(|| Arc::new(ProcessIo::default()) as Arc<dyn IoAttachment>),
            logger: self.logger,
            program_name,
            working_directory: self.working_directory,
            grace_period: self.grace_period,
        };
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn default_program_name(launch_path: &str) -> String {
    Path::new(launch_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(launch_path)
        .to_string()
}
