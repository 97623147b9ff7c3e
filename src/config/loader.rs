// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawTaskFile, TaskFile};
use crate::errors::Result;

/// Load a task file from a given path and return the raw `RawTaskFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (unknown names, cycles, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskFile> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading task file");
    let contents = fs::read_to_string(path)?;

    let raw: RawTaskFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a task file from path and validate it into a [`TaskFile`].
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` default functions).
/// - Expands `[[constraint]] order = [...]` chains into edges.
/// - Checks for duplicate or unknown process names and constraint cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskFile> {
    let raw = load_from_path(&path)?;
    let file = TaskFile::try_from(raw)?;
    Ok(file)
}

/// Default task file location: `Task.toml` in the current working directory.
pub fn default_task_path() -> PathBuf {
    PathBuf::from("Task.toml")
}
