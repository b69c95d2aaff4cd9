//! Process execution and the dry-run adapter

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{FastDevError, Result};
use crate::plan::CommandPlan;

/// Options for one external command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,
    /// Extra variables merged over the inherited environment
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn captured() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }
}

/// Result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs shell command lines
pub trait Executor {
    fn run(&self, command: &str, opts: &RunOptions) -> Result<Output>;

    /// Trimmed stdout of `command`, empty if it could not be run
    fn capture(&self, command: &str) -> String {
        self.run(command, &RunOptions::captured())
            .map(|o| o.stdout.trim().to_string())
            .unwrap_or_default()
    }

    /// Whether `command` exits with 0; output is discarded
    fn check(&self, command: &str) -> bool {
        self.run(command, &RunOptions::captured())
            .map(|o| o.success())
            .unwrap_or(false)
    }
}

/// Executes through the platform shell
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl Executor for ShellExecutor {
    fn run(&self, command: &str, opts: &RunOptions) -> Result<Output> {
        let mut cmd = shell_command(command);
        cmd.envs(opts.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if opts.capture {
            let output = cmd.stdin(Stdio::null()).output()?;
            Ok(Output {
                code: output.status.code().unwrap_or(1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        } else {
            let status = cmd.status()?;
            Ok(Output {
                code: status.code().unwrap_or(1),
                ..Output::default()
            })
        }
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// What to do when a live command fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Return `FastDevError::CommandFailed` to the caller
    #[default]
    Raise,
    /// Exit the process with the command's code
    Terminate,
}

/// Per-call execution configuration
#[derive(Debug, Clone, Default)]
pub struct ExecMode {
    /// Only print the command
    pub dry: bool,
    pub exit_policy: ExitPolicy,
}

impl ExecMode {
    pub fn dry(dry: bool) -> Self {
        Self {
            dry,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }
}

/// Print a plan, then run it unless in dry mode
///
/// The printed line and the executed line are the same rendering of `plan`.
pub fn execute(
    plan: &CommandPlan,
    mode: &ExecMode,
    executor: &dyn Executor,
    out: &mut dyn Write,
) -> Result<Output> {
    let line = plan.render();
    writeln!(out, "--> {}", line)?;
    if mode.dry {
        return Ok(Output::default());
    }

    tracing::debug!(command = %line, "running");
    let output = executor.run(&line, &RunOptions::default())?;
    if !output.success() {
        match mode.exit_policy {
            ExitPolicy::Raise => {
                return Err(FastDevError::CommandFailed {
                    command: line,
                    code: output.code,
                })
            }
            ExitPolicy::Terminate => {
                out.flush()?;
                std::process::exit(output.code);
            }
        }
    }
    Ok(output)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeExecutor;
    use super::*;
    use crate::plan::Command as Cmd;

    #[test]
    fn test_dry_prints_without_running() {
        let exec = FakeExecutor::default();
        let plan: CommandPlan = Cmd::new("poetry").args(["publish", "--build"]).into();
        let mut out = Vec::new();
        let result = execute(&plan, &ExecMode::dry(true), &exec, &mut out).unwrap();
        assert!(result.success());
        assert_eq!(String::from_utf8(out).unwrap(), "--> poetry publish --build\n");
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn test_dry_line_matches_live_line() {
        let plan = CommandPlan::and([
            Cmd::new("uv").arg("build"),
            Cmd::new("uv").arg("publish"),
        ]);
        let exec = FakeExecutor::default();
        let mut dry_out = Vec::new();
        execute(&plan, &ExecMode::dry(true), &exec, &mut dry_out).unwrap();
        execute(&plan, &ExecMode::dry(false), &exec, &mut Vec::new()).unwrap();

        let printed = String::from_utf8(dry_out).unwrap();
        let executed = exec.calls.borrow()[0].clone();
        assert_eq!(printed.trim_end().strip_prefix("--> ").unwrap(), executed);
    }

    #[test]
    fn test_failure_raises_with_code() {
        let exec = FakeExecutor::default().respond("false", 2, "");
        let plan = CommandPlan::Shell("false".to_string());
        let err = execute(&plan, &ExecMode::dry(false), &exec, &mut Vec::new()).unwrap_err();
        match err {
            FastDevError::CommandFailed { code, command } => {
                assert_eq!(code, 2);
                assert_eq!(command, "false");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_capture_and_check_helpers() {
        let exec = FakeExecutor::default()
            .respond("git tag", 0, "v0.1.0\nv0.1.1\n")
            .respond("ruff --version", 127, "");
        assert_eq!(exec.capture("git tag"), "v0.1.0\nv0.1.1");
        assert!(!exec.check("ruff --version"));
        assert!(exec.check("anything else"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_executor_merges_env() {
        let opts = RunOptions {
            capture: true,
            env: vec![("FASTDEV_TEST_VAR".to_string(), "foo".to_string())],
        };
        let out = ShellExecutor.run("echo $FASTDEV_TEST_VAR", &opts).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "foo");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_executor_reports_exit_code() {
        let out = ShellExecutor.run("exit 3", &RunOptions::captured()).unwrap();
        assert_eq!(out.code, 3);
    }
}
