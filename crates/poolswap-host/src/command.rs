//! Thin wrapper around `std::process::Command` for host tools.
//!
//! Every invocation is logged at debug level and non-zero exits are turned
//! into `HostError::ToolFailed` with the captured stderr.

use crate::HostError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct ToolCommand {
    binary: PathBuf,
}

#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl ToolCommand {
    pub(crate) fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub(crate) fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run to completion and capture output, whatever the exit status.
    pub(crate) fn run<I, S>(&self, args: I) -> Result<ToolOutput, HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        debug!("exec: {} {}", self.binary.display(), render_args(&args));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| HostError::Spawn {
                tool: self.binary.display().to_string(),
                source,
            })?;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }

    /// Run and fail unless the tool exits zero. Returns stdout.
    pub(crate) fn run_checked<I, S>(&self, args: I) -> Result<String, HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let out = self.run(&args)?;
        if out.success() {
            Ok(out.stdout)
        } else {
            Err(self.failure(&args, &out))
        }
    }

    /// Run with the terminal attached, for tools that may prompt (cryptsetup).
    pub(crate) fn run_interactive<I, S>(&self, args: I) -> Result<(), HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        debug!(
            "exec (interactive): {} {}",
            self.binary.display(),
            render_args(&args)
        );

        let status = Command::new(&self.binary)
            .args(&args)
            .status()
            .map_err(|source| HostError::Spawn {
                tool: self.binary.display().to_string(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(HostError::ToolFailed {
                tool: self.binary.display().to_string(),
                args: render_args(&args),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }

    pub(crate) fn failure(&self, args: &[OsString], out: &ToolOutput) -> HostError {
        HostError::ToolFailed {
            tool: self.binary.display().to_string(),
            args: render_args(args),
            status: out.status.to_string(),
            stderr: out.stderr.trim().to_owned(),
        }
    }
}

fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_stdout() {
        let cmd = ToolCommand::new("echo");
        let out = cmd.run(["hello"]).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn run_checked_reports_failure() {
        let cmd = ToolCommand::new("false");
        let err = cmd.run_checked(["ignored"]).unwrap_err();
        match err {
            HostError::ToolFailed { tool, args, .. } => {
                assert_eq!(tool, "false");
                assert_eq!(args, "ignored");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let cmd = ToolCommand::new("/nonexistent/poolswap-test-tool");
        assert!(matches!(
            cmd.run(Vec::<&str>::new()),
            Err(HostError::Spawn { .. })
        ));
    }
}
