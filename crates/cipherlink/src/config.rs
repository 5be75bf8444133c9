//! Session configuration.
//!
//! The coordinator needs three things: where the log file goes, and which
//! programs to run as engine and logger. Programs default to the sibling
//! executables installed next to the running coordinator.

use std::path::{Path, PathBuf};

use crate::orchestrator::WorkerPrograms;

pub const ENGINE_PROGRAM: &str = "cipherlink-engine";
pub const LOGGER_PROGRAM: &str = "cipherlink-logger";

/// Env var overriding the engine program path.
pub const ENGINE_ENV: &str = "CIPHERLINK_ENGINE";
/// Env var overriding the logger program path.
pub const LOGGER_ENV: &str = "CIPHERLINK_LOGGER";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub log_file: PathBuf,
    pub engine_program: PathBuf,
    pub logger_program: PathBuf,
}

impl SessionConfig {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            engine_program: sibling_program(ENGINE_PROGRAM),
            logger_program: sibling_program(LOGGER_PROGRAM),
        }
    }

    pub fn with_engine_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.engine_program = program.into();
        self
    }

    pub fn with_logger_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.logger_program = program.into();
        self
    }

    pub fn programs(&self) -> WorkerPrograms {
        WorkerPrograms {
            engine: self.engine_program.clone(),
            logger: self.logger_program.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

/// Path of `name` next to the current executable, or bare `name` for a PATH lookup.
pub fn sibling_program(name: &str) -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => sibling_of(&exe, name),
        Err(e) => {
            tracing::debug!(error = %e, program = name, "Cannot locate current executable");
            PathBuf::from(name)
        }
    }
}

fn sibling_of(exe: &Path, name: &str) -> PathBuf {
    let file_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    match exe.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
