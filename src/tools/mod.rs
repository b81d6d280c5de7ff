// src/tools/mod.rs

//! External tool invocation
//!
//! All package inspection goes through external programs (`rpm`, `readelf`,
//! `nm`, `tar`, `ctags`, ...). Programs are always spawned with an argument
//! vector, never through a shell, so paths containing metacharacters are
//! passed through untouched. Every invocation is bounded by a timeout; a
//! tool that hangs is killed and reported as a [`Error::ToolError`].

mod archive;
mod ctags;
mod elf;
mod inspector;
mod rpm;

pub use elf::is_elf;
pub use inspector::{PackageInspector, SystemInspector};

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// A program and its arguments
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The command line in copy-pasteable, shell-quoted form
    pub fn command_line(&self) -> String {
        let mut parts = vec![shell_quote(&self.program)];
        parts.extend(self.args.iter().map(|a| shell_quote(&a.to_string_lossy())));
        parts.join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Captured result of a finished tool
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs external tools with a wall-clock bound
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a command and return its output whatever the exit status
    pub fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        debug!("Running: {}", cmd.command_line());

        let mut child = cmd
            .to_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(cmd, e))?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);
        let status = wait_bounded(&mut child, self.timeout, cmd)?;

        Ok(ToolOutput {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }

    /// Run a command, failing on a non-zero exit status
    pub fn run_checked(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        let output = self.run(cmd)?;
        if !output.success() {
            return Err(exit_error(cmd, &output));
        }
        Ok(output)
    }

    /// Run `first | second`; the timeout covers the whole pipeline
    pub fn pipeline(&self, first: &ToolCommand, second: &ToolCommand) -> Result<ToolOutput> {
        debug!("Running: {} | {}", first.command_line(), second.command_line());
        let deadline = Instant::now() + self.timeout;

        let mut upstream = first
            .to_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(first, e))?;

        let pipe = upstream
            .stdout
            .take()
            .ok_or_else(|| Error::ToolError(format!("{} produced no stdout pipe", first.program())))?;
        let upstream_stderr = upstream.stderr.take().map(spawn_reader);

        let mut downstream = match second
            .to_command()
            .stdin(Stdio::from(pipe))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let _ = upstream.kill();
                let _ = upstream.wait();
                return Err(spawn_error(second, e));
            }
        };

        let stdout = downstream.stdout.take().map(spawn_reader);
        let stderr = downstream.stderr.take().map(spawn_reader);

        let status = match wait_bounded(&mut downstream, remaining(deadline), second) {
            Ok(status) => status,
            Err(e) => {
                let _ = upstream.kill();
                let _ = upstream.wait();
                return Err(e);
            }
        };
        let upstream_status = wait_bounded(&mut upstream, remaining(deadline), first)?;
        let upstream_err = join_reader(upstream_stderr);

        let output = ToolOutput {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        };

        if !upstream_status.success() {
            return Err(Error::ToolError(format!(
                "{} exited with {}: {}",
                first.program(),
                upstream_status,
                upstream_err.trim()
            )));
        }
        if !output.success() {
            return Err(exit_error(second, &output));
        }
        Ok(output)
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Wait for `child`, killing it when the timeout elapses
fn wait_bounded(child: &mut Child, timeout: Duration, cmd: &ToolCommand) -> Result<ExitStatus> {
    match child.wait_timeout(timeout)? {
        Some(status) => Ok(status),
        None => {
            warn!("{} timed out after {} seconds, killing it", cmd.program(), timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            Err(Error::ToolError(format!(
                "{} timed out after {} seconds",
                cmd.command_line(),
                timeout.as_secs()
            )))
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn spawn_error(cmd: &ToolCommand, e: std::io::Error) -> Error {
    Error::ToolError(format!("Failed to run {}: {}", cmd.program(), e))
}

fn exit_error(cmd: &ToolCommand, output: &ToolOutput) -> Error {
    Error::ToolError(format!(
        "{} exited with {}: {}",
        cmd.command_line(),
        output.status,
        output.stderr.trim()
    ))
}

/// Quote `arg` for display in a POSIX shell command line
pub fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/usr/bin/bash"), "/usr/bin/bash");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
        assert_eq!(shell_quote("x;y|z"), "'x;y|z'");
    }

    #[test]
    fn test_command_line() {
        let cmd = ToolCommand::new("rpm")
            .args(["-qp", "--nosignature"])
            .arg("/tmp/my package.rpm");
        assert_eq!(cmd.command_line(), "rpm -qp --nosignature '/tmp/my package.rpm'");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let output = runner
            .run(&ToolCommand::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.status.code(), Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_checked_fails_on_nonzero() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let result = runner.run_checked(&ToolCommand::new("false"));
        assert!(matches!(result, Err(Error::ToolError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_are_not_interpreted() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let output = runner
            .run_checked(&ToolCommand::new("echo").arg("$(echo injected); ls"))
            .unwrap();
        assert_eq!(output.stdout.trim(), "$(echo injected); ls");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_tool() {
        let runner = ToolRunner::new(Duration::from_millis(200));
        let start = Instant::now();
        let result = runner.run(&ToolCommand::new("sleep").arg("10"));
        assert!(matches!(result, Err(Error::ToolError(ref m)) if m.contains("timed out")));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program() {
        let runner = ToolRunner::new(Duration::from_secs(1));
        let result = runner.run(&ToolCommand::new("rq-no-such-tool-xyz"));
        assert!(matches!(result, Err(Error::ToolError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let output = runner
            .pipeline(
                &ToolCommand::new("printf").arg("b\\na\\nb\\n"),
                &ToolCommand::new("sort").arg("-u"),
            )
            .unwrap();
        assert_eq!(output.stdout, "a\nb\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_upstream_failure() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let result = runner.pipeline(&ToolCommand::new("false"), &ToolCommand::new("cat"));
        assert!(matches!(result, Err(Error::ToolError(_))));
    }
}
