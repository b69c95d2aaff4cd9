//! Export the lock file to requirements format and install it with pip

use crate::error::{FastDevError, Result};
use crate::plan::{Command, CommandPlan};
use crate::tool::ManagedTool;

use super::Planner;

pub const DEFAULT_REQUIREMENTS: &str = "dev_requirements.txt";

#[derive(Debug, Clone)]
pub struct SyncPlanner {
    pub tool: ManagedTool,
    /// Requirements file written by the export step
    pub filename: String,
    /// Extras passed to `poetry export`
    pub extras: Option<String>,
    /// Keep the requirements file afterwards
    pub save: bool,
    pub in_venv: bool,
    /// The requirements file already existed before running
    pub target_exists: bool,
    /// `python -m pip` is usable in the target environment
    pub pip_available: bool,
    /// Manifest declares a poetry dev group
    pub with_dev: bool,
}

impl SyncPlanner {
    fn export_command(&self) -> Command {
        match self.tool {
            ManagedTool::Uv => {
                Command::new("uv").args(["export", "--no-hashes", "--all-extras", "--frozen"])
            }
            ManagedTool::Poetry => Command::new("poetry")
                .args(["export", "--without-hashes"])
                .arg_if(self.with_dev, "--with=dev")
                .args(
                    self.extras
                        .iter()
                        .filter(|e| !e.is_empty())
                        .map(|e| format!("--extras={}", e)),
                ),
            _ => Command::new(self.tool.as_str()).args(["export", "--without-hashes", "--with=dev"]),
        }
    }

    /// Poetry environments always ship pip; the others may not
    fn needs_ensurepip(&self) -> bool {
        self.tool != ManagedTool::Poetry && !self.pip_available
    }
}

impl Planner for SyncPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        if !self.tool.is_managed() {
            if !self.target_exists || !self.in_venv {
                return Err(FastDevError::Environment(
                    "There project is not managed by uv/pdm/poetry!".to_string(),
                ));
            }
            return Ok(Command::new("python")
                .args(["-m", "pip", "install", "-r", &self.filename])
                .into());
        }

        let runner = if self.in_venv { None } else { self.tool.runner() };
        let python = || Command::run_via(runner, "python");

        let mut steps: Vec<CommandPlan> =
            vec![self.export_command().args(["-o", &self.filename]).into()];
        if self.needs_ensurepip() {
            steps.push(python().args(["-m", "ensurepip"]).into());
            steps.push(python().args(["-m", "pip", "install", "-U", "pip"]).into());
        }
        steps.push(
            python()
                .args(["-m", "pip", "install", "-r", &self.filename])
                .into(),
        );
        if !self.target_exists && !self.save {
            steps.push(Command::new("rm").args(["-f", &self.filename]).into());
        }
        Ok(CommandPlan::and(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(tool: ManagedTool) -> SyncPlanner {
        SyncPlanner {
            tool,
            filename: "req.txt".to_string(),
            extras: None,
            save: false,
            in_venv: true,
            target_exists: false,
            pip_available: true,
            with_dev: false,
        }
    }

    #[test]
    fn test_poetry_in_venv_with_extras() {
        let mut p = planner(ManagedTool::Poetry);
        p.extras = Some("all".to_string());
        assert_eq!(
            p.plan().unwrap().render(),
            "poetry export --without-hashes --extras=all -o req.txt && python -m pip install -r req.txt && rm -f req.txt"
        );
    }

    #[test]
    fn test_poetry_outside_venv_keeps_file() {
        let mut p = planner(ManagedTool::Poetry);
        p.in_venv = false;
        p.save = true;
        p.with_dev = true;
        assert_eq!(
            p.plan().unwrap().render(),
            "poetry export --without-hashes --with=dev -o req.txt && poetry run python -m pip install -r req.txt"
        );
    }

    #[test]
    fn test_existing_file_is_not_removed() {
        let mut p = planner(ManagedTool::Pdm);
        p.target_exists = true;
        let plan = p.plan().unwrap();
        assert!(plan.commands().iter().all(|c| c.program != "rm"));
    }

    #[test]
    fn test_uv_without_pip_bootstraps_it() {
        let mut p = planner(ManagedTool::Uv);
        p.pip_available = false;
        p.in_venv = false;
        assert_eq!(
            p.plan().unwrap().render(),
            "uv export --no-hashes --all-extras --frozen -o req.txt && uv run python -m ensurepip && uv run python -m pip install -U pip && uv run python -m pip install -r req.txt && rm -f req.txt"
        );
    }

    #[test]
    fn test_exactly_one_export_per_tool() {
        for tool in [ManagedTool::Poetry, ManagedTool::Pdm, ManagedTool::Uv] {
            for (target_exists, save) in [(false, false), (false, true), (true, false)] {
                let mut p = planner(tool);
                p.target_exists = target_exists;
                p.save = save;
                let plan = p.plan().unwrap();
                let commands = plan.commands();
                let exports = commands
                    .iter()
                    .filter(|c| c.program == tool.as_str() && c.args.first().map(String::as_str) == Some("export"))
                    .count();
                assert_eq!(exports, 1, "{tool}");
                let cleans = commands.last().unwrap().program == "rm";
                assert_eq!(cleans, !target_exists && !save, "{tool}");
            }
        }
    }

    #[test]
    fn test_unmanaged_project() {
        let mut p = planner(ManagedTool::None);
        assert!(matches!(p.plan(), Err(FastDevError::Environment(_))));
        p.target_exists = true;
        assert_eq!(p.plan().unwrap().render(), "python -m pip install -r req.txt");
        p.in_venv = false;
        assert!(p.plan().is_err());
    }
}
