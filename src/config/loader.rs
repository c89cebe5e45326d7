// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawTaskFile, TaskFile};
use crate::errors::Result;

/// Read and deserialize a task file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawTaskFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Read a task file and turn it into a validated [`TaskFile`].
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks:
///   - launch path / program name / exit code invariants,
///   - stream targets that need a path have one,
///   - durations parse and are non-zero.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskFile> {
    let raw = load_from_path(&path)?;
    let task_file = TaskFile::try_from(raw)?;
    Ok(task_file)
}
