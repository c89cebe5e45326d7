// src/config/validate.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::model::{IoSection, RawTaskFile, TaskFile};
use crate::errors::{Result, TaskError};
use crate::io::{InputMode, IoAttachment, OutputMode, ProcessIo};
use crate::logger::{TaskLogger, TracingLogger};
use crate::task::TaskConfiguration;
use crate::task::configuration::default_program_name;
use crate::types::{StdinSource, StreamTarget};

impl TryFrom<RawTaskFile> for TaskFile {
    type Error = TaskError;

    fn try_from(raw: RawTaskFile) -> std::result::Result<Self, Self::Error> {
        let task = raw.task;

        let program_name = task
            .program_name
            .clone()
            .unwrap_or_else(|| default_program_name(&task.launch_path));
        let io = build_io(&task.io)?;
        let logger: Arc<dyn TaskLogger> = Arc::new(TracingLogger::new(program_name.clone()));

        let mut builder = TaskConfiguration::builder(task.launch_path)
            .program_name(program_name)
            .args(task.arguments)
            .envs(task.environment)
            .io(io)
            .logger(logger);

        if task.inherit_environment {
            builder = builder.inherit_environment();
        }
        if let Some(codes) = task.acceptable_exit_codes {
            builder = builder.acceptable_exit_codes(codes);
        }
        if let Some(dir) = task.working_directory {
            builder = builder.working_directory(dir);
        }
        if let Some(grace) = task.grace_period.as_deref() {
            builder = builder.grace_period(parse_field_duration("grace_period", grace)?);
        }

        let timeout = match task.timeout.as_deref() {
            Some(s) => {
                let timeout = parse_field_duration("timeout", s)?;
                if timeout.is_zero() {
                    return Err(TaskError::Config(
                        "[task].timeout must be greater than zero".to_string(),
                    ));
                }
                Some(timeout)
            }
            None => None,
        };

        let configuration = builder.build()?;
        Ok(TaskFile::new_unchecked(configuration, timeout))
    }
}

fn build_io(section: &IoSection) -> Result<Arc<dyn IoAttachment>> {
    let stdin = match section.stdin {
        StdinSource::Null => InputMode::Null,
        StdinSource::Inherit => InputMode::Inherit,
        StdinSource::File => InputMode::File(required_path("stdin", &section.stdin_path)?),
    };
    if section.stdin != StdinSource::File {
        reject_stray_path("stdin", &section.stdin_path)?;
    }

    let stdout = output_mode("stdout", section.stdout, &section.stdout_path)?;
    let stderr = output_mode("stderr", section.stderr, &section.stderr_path)?;

    Ok(Arc::new(ProcessIo::new(stdin, stdout, stderr)))
}

fn output_mode(
    stream: &str,
    target: StreamTarget,
    path: &Option<PathBuf>,
) -> Result<OutputMode> {
    if target != StreamTarget::File {
        reject_stray_path(stream, path)?;
    }

    Ok(match target {
        StreamTarget::Inherit => OutputMode::Inherit,
        StreamTarget::Null => OutputMode::Null,
        StreamTarget::Log => OutputMode::Log,
        StreamTarget::File => OutputMode::File(required_path(stream, path)?),
    })
}

fn required_path(stream: &str, path: &Option<PathBuf>) -> Result<PathBuf> {
    path.clone().ok_or_else(|| {
        TaskError::Config(format!(
            "[task.io].{stream} = \"file\" requires [task.io].{stream}_path"
        ))
    })
}

fn reject_stray_path(stream: &str, path: &Option<PathBuf>) -> Result<()> {
    if path.is_some() {
        return Err(TaskError::Config(format!(
            "[task.io].{stream}_path is set but [task.io].{stream} is not \"file\""
        )));
    }
    Ok(())
}

fn parse_field_duration(field: &str, s: &str) -> Result<Duration> {
    parse_duration(s).map_err(|e| TaskError::Config(format!("[task].{field}: {e}")))
}

/// Parse `<digits><unit>` where unit is `ms`, `s`, `m` or `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
