use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, trace};

use super::error::EngineError;

/// A fully described external command: what to run, where, and what to feed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    /// Text written to the child's stdin, for tools that prompt interactively.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: workdir.into(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn path_arg(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(path.as_ref().display().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// The value following `flag` in the argument list, if any.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(input) = &self.stdin {
            write!(f, "echo {} | ", shell_quote(input.trim_end()))?;
        }
        write!(f, "{}", shell_quote(&self.program.display().to_string()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Launches external commands. The pipeline only ever talks to this seam.
pub trait Executor {
    /// Runs `command` to completion and reports how it exited.
    ///
    /// # Errors
    ///
    /// Fails only when the process could not be started at all; a non-zero
    /// exit is a normal [`JobStatus::Fail`] result.
    fn invoke(&self, command: &CommandSpec) -> Result<JobResult, EngineError>;
}

/// Runs commands as child processes of the current one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn invoke(&self, command: &CommandSpec) -> Result<JobResult, EngineError> {
        let spawn_error = |e: std::io::Error| EngineError::JobExecution {
            command: command.to_string(),
            message: format!("failed to start process: {}", e),
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.workdir)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(input), Some(mut pipe)) = (&command.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).map_err(spawn_error)?;
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        Ok(JobResult {
            status: if output.status.success() {
                JobStatus::Success
            } else {
                JobStatus::Fail
            },
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub fail_on_nonzero: bool,
    /// Replaces the default failure message when the command fails.
    pub failure_message: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fail_on_nonzero: true,
            failure_message: None,
        }
    }
}

impl RunOptions {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            fail_on_nonzero: true,
            failure_message: Some(message.into()),
        }
    }

    pub fn tolerate_failure() -> Self {
        Self {
            fail_on_nonzero: false,
            failure_message: None,
        }
    }
}

/// Synchronous, fail-fast execution of external jobs.
#[derive(Clone, Copy)]
pub struct JobRunner<'a> {
    executor: &'a dyn Executor,
}

impl<'a> JobRunner<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    pub fn run(&self, command: &CommandSpec) -> Result<JobResult, EngineError> {
        self.run_with(command, RunOptions::default())
    }

    pub fn run_with(
        &self,
        command: &CommandSpec,
        options: RunOptions,
    ) -> Result<JobResult, EngineError> {
        debug!(command = %command, workdir = %command.workdir.display(), "Running external job");
        let result = self.executor.invoke(command)?;

        if result.is_success() {
            trace!(command = %command, "External job succeeded");
            return Ok(result);
        }

        error!("{} run failed", command);
        debug!("stdout:\n{}", result.stdout);
        debug!("stderr:\n{}", result.stderr);

        if options.fail_on_nonzero {
            let message = options.failure_message.unwrap_or_else(|| match result.exit_code {
                Some(code) => format!("{} run failed (exit code {})", command, code),
                None => format!("{} run failed (terminated by signal)", command),
            });
            return Err(EngineError::JobExecution {
                command: command.to_string(),
                message,
            });
        }

        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;

    fn command() -> CommandSpec {
        CommandSpec::new("tleap", "/tmp").args(["-f", "leap.in"])
    }

    #[test]
    fn display_renders_a_shell_like_line() {
        let spec = CommandSpec::new("gmx", "/tmp")
            .args(["make_ndx", "-f", "my file.pdb"])
            .stdin("q\n");
        assert_eq!(spec.to_string(), "echo q | gmx make_ndx -f 'my file.pdb'");
        assert_eq!(command().to_string(), "tleap -f leap.in");
    }

    #[test]
    fn flag_value_finds_the_following_argument() {
        let spec = command();
        assert_eq!(spec.flag_value("-f"), Some("leap.in"));
        assert_eq!(spec.flag_value("-o"), None);
        assert_eq!(CommandSpec::new("/usr/bin/tleap", ".").program_name(), "tleap");
    }

    #[test]
    fn zero_exit_returns_success() {
        let executor = RecordingExecutor::new();
        let result = JobRunner::new(&executor).run(&command()).unwrap();
        assert_eq!(result.status, JobStatus::Success);
        assert_eq!(executor.calls().len(), 1);
    }

    #[test]
    fn nonzero_exit_raises_with_default_message_naming_the_command() {
        let executor = RecordingExecutor::new().fail_on("tleap");
        let err = JobRunner::new(&executor).run(&command()).unwrap_err();
        match err {
            EngineError::JobExecution { command, message } => {
                assert_eq!(command, "tleap -f leap.in");
                assert!(message.starts_with("tleap -f leap.in run failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nonzero_exit_raises_with_supplied_message() {
        let executor = RecordingExecutor::new().fail_on("tleap");
        let err = JobRunner::new(&executor)
            .run_with(&command(), RunOptions::with_message("check the ligand charge"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::JobExecution { ref message, .. } if message == "check the ligand charge"
        ));
    }

    #[test]
    fn nonzero_exit_without_fail_on_nonzero_returns_fail() {
        let executor = RecordingExecutor::new().fail_on("tleap");
        let result = JobRunner::new(&executor)
            .run_with(&command(), RunOptions::tolerate_failure())
            .unwrap();
        assert_eq!(result.status, JobStatus::Fail);
        assert_eq!(result.stderr, "simulated failure");
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_captures_streams_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let ok = CommandSpec::new("sh", dir.path()).args(["-c", "cat; echo err >&2"]).stdin("hello");
        let result = ProcessExecutor.invoke(&ok).unwrap();
        assert!(result.is_success());
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.stderr, "err\n");

        let failing = CommandSpec::new("sh", dir.path()).args(["-c", "exit 3"]);
        let result = ProcessExecutor.invoke(&failing).unwrap();
        assert_eq!(result.status, JobStatus::Fail);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn process_executor_reports_unstartable_programs() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("definitely-not-a-real-binary-xyz", dir.path());
        assert!(matches!(
            ProcessExecutor.invoke(&spec),
            Err(EngineError::JobExecution { .. })
        ));
    }
}
