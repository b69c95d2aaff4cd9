//! Format, lint and type-check pipeline

use crate::config::Settings;
use crate::error::Result;
use crate::plan::{Command, CommandPlan};
use crate::tool::ManagedTool;

use super::Planner;

pub const INSTALL_HINT: &str = "You may need to run following command to install lint tools:";
pub const INSTALL_COMMAND: &str = "python -m pip install -U \"fast_dev_cli\"";
/// Succeeds when the hint's package is importable from the current python
pub const SELF_IMPORT_CMD: &str = "python -c \"import fast_dev_cli\"";

#[derive(Debug, Clone)]
pub struct LintPlanner {
    /// Files or directories to operate on; empty means the whole project
    pub paths: Vec<String>,
    /// Verify only, never rewrite files
    pub check_only: bool,
    /// Append a bandit scan (flag or `FASTDEVCLI_BANDIT`)
    pub bandit: bool,
    pub settings: Settings,
    pub in_venv: bool,
    /// `ruff` is runnable without a runner prefix
    pub ruff_available: bool,
    pub tool: ManagedTool,
    /// Manifest has a `[tool.bandit]` table
    pub has_bandit_config: bool,
    /// Directory scanned by bandit when there is no bandit config
    pub package_dir: String,
}

impl LintPlanner {
    fn targets(&self) -> Vec<String> {
        if self.paths.is_empty() {
            vec![".".to_string()]
        } else {
            self.paths.clone()
        }
    }

    pub fn is_whole_project(&self) -> bool {
        self.targets() == ["."]
    }

    fn is_html_only(&self) -> bool {
        !self.paths.is_empty() && self.paths.iter().all(|p| p.ends_with(".html"))
    }

    fn runner(&self) -> Option<&'static str> {
        if self.in_venv && self.ruff_available {
            None
        } else {
            self.tool.runner()
        }
    }

    /// Inside an environment that lacks ruff the user should install it
    pub fn needs_install_hint(&self) -> bool {
        self.in_venv && !self.ruff_available && !self.is_html_only()
    }

    fn mypy(&self, paths: &[String]) -> Option<Command> {
        if self.settings.skip_mypy {
            return None;
        }
        let runner = self.runner();
        if self.is_whole_project() && !self.settings.no_dmypy {
            return Some(Command::run_via(runner, "dmypy").args(["run", "."]));
        }
        Some(
            Command::run_via(runner, "mypy")
                .arg_if(self.settings.ignore_missing_imports, "--ignore-missing-imports")
                .args(paths),
        )
    }

    fn bandit_scan(&self) -> Command {
        let bandit = Command::run_via(self.runner(), "bandit");
        if self.has_bandit_config {
            bandit.args(["-c", "pyproject.toml", "-r", "."])
        } else {
            bandit.args(["-r", &self.package_dir])
        }
    }
}

impl Planner for LintPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        if self.is_html_only() {
            return Ok(Command::new("prettier").arg("-w").args(&self.paths).into());
        }

        let paths = self.targets();
        let runner = self.runner();
        let mut steps = vec![
            Command::run_via(runner, "ruff")
                .arg("format")
                .arg_if(self.check_only, "--check")
                .args(&paths),
            Command::run_via(runner, "ruff")
                .args(["check", "--extend-select=I,B,SIM"])
                .arg_if(!self.check_only && !self.settings.no_fix, "--fix")
                .args(&paths),
        ];
        steps.extend(self.mypy(&paths));
        if self.bandit && self.is_whole_project() {
            steps.push(self.bandit_scan());
        }
        Ok(CommandPlan::and(steps))
    }
}
