use std::fs;
use std::path::{Path, PathBuf};

use super::error::EngineError;
use super::progress::ProgressReporter;
use super::runner::{CommandSpec, Executor, JobRunner};
use super::toolchain::{Tool, Toolchain};

/// The collaborators shared by every workflow step: where to work, which
/// programs to call, how to launch them and whom to tell about progress.
#[derive(Clone, Copy)]
pub struct WorkflowContext<'a> {
    pub workdir: &'a Path,
    pub toolchain: &'a Toolchain,
    pub executor: &'a dyn Executor,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> WorkflowContext<'a> {
    pub fn new(
        workdir: &'a Path,
        toolchain: &'a Toolchain,
        executor: &'a dyn Executor,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            workdir,
            toolchain,
            executor,
            reporter,
        }
    }

    pub fn runner(&self) -> JobRunner<'a> {
        JobRunner::new(self.executor)
    }

    /// A command for `tool`, to be run inside the working directory.
    pub fn command(&self, tool: Tool) -> Result<CommandSpec, EngineError> {
        Ok(CommandSpec::new(self.toolchain.path(tool)?, self.workdir))
    }

    /// Writes a generated input file into `dir`.
    pub fn write_input(&self, dir: &Path, name: &str, contents: &str) -> Result<PathBuf, EngineError> {
        let path = dir.join(name);
        fs::write(&path, contents).map_err(|e| EngineError::io(&path, e))?;
        Ok(path)
    }

    /// Makes `path` absolute against the process working directory, so it
    /// stays valid for jobs spawned inside [`workdir`](Self::workdir).
    pub fn absolute(&self, path: &Path) -> Result<PathBuf, EngineError> {
        std::path::absolute(path).map_err(|e| EngineError::io(path, e))
    }
}
