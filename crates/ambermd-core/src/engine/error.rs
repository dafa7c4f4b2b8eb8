use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Command `{command}` failed: {message}")]
    JobExecution { command: String, message: String },

    #[error("Failed to parse structure '{}': {message}", path.display())]
    StructureParse { path: PathBuf, message: String },

    #[error("Unsupported system: {0}")]
    UnsupportedSystem(String),

    #[error("Required tool '{tool}' not found (looked for executable '{executable}')")]
    MissingDependency { tool: &'static str, executable: String },

    #[error("Stage '{stage}' finished but did not produce '{}'", path.display())]
    MissingArtifact { stage: String, path: PathBuf },

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Wraps a format-level parse error for the file at `path`.
    pub fn structure(path: impl AsRef<Path>, error: impl std::fmt::Display) -> Self {
        Self::StructureParse {
            path: path.as_ref().to_path_buf(),
            message: error.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
