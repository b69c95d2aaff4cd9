//! Fact gathering and operation dispatch
//!
//! A `Session` owns everything the planners must not touch themselves: the
//! working directory, the active environment, the settings and the executor.
//! Each operation gathers its facts, asks a planner for a plan and hands the
//! plan to `execute`.

use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::config::Settings;
use crate::error::{FastDevError, Result};
use crate::exec::{execute, ExecMode, ExitPolicy, Executor, Output};
use crate::locator::{locate, PythonEnv, MANIFEST_FILE};
use crate::manifest::Manifest;
use crate::plan::{Command, CommandPlan};
use crate::planners::deps::{choose_installer, Installer, ProjectFiles};
use crate::planners::lint::{INSTALL_COMMAND, INSTALL_HINT, SELF_IMPORT_CMD};
use crate::planners::tag::{has_v_prefix, DIRTY_TREE_MESSAGE, GIT_STATUS_CMD, GIT_TAGS_CMD};
use crate::planners::test::find_test_script;
use crate::planners::upgrade::should_with_dev;
use crate::planners::{
    bump, BumpPart, BumpPlanner, DepsPlanner, DevServerPlanner, LintPlanner, Planner,
    PublishPlanner, SyncPlanner, TagPlanner, TestPlanner, UpgradePlanner,
};
use crate::tool::{DetectionOrder, ManagedTool};
use crate::version::{self, current_version, package_name_for, VersionQuery, UNKNOWN_VERSION};

pub const TAG_HINT: &str = "You may want to pin tag by `fast tag`";
pub const PUBLISH_HINT: &str = "You may want to publish package:";

#[derive(Debug, Clone)]
pub struct BumpRequest {
    pub part: BumpPart,
    pub commit: bool,
    /// Add `--message-emoji=1` when the last commit message starts with an emoji
    pub emoji: bool,
    pub dry: bool,
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub filename: String,
    pub extras: Option<String>,
    pub save: bool,
    pub dry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    /// Overrides detection
    pub tool: Option<String>,
    pub dry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LintRequest {
    pub paths: Vec<String>,
    pub check_only: bool,
    pub bandit: bool,
    pub skip_mypy: bool,
    pub dry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TagRequest {
    pub message: String,
    pub dry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DevRequest {
    pub target: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub dry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TestRequest {
    pub ignore_script: bool,
    pub dry: bool,
}

#[derive(Debug, Clone)]
pub struct DepsRequest {
    pub installer: Option<Installer>,
    pub prod: bool,
    pub inexact: bool,
    pub active: bool,
    pub dry: bool,
}

impl Default for DepsRequest {
    fn default() -> Self {
        Self {
            installer: None,
            prod: false,
            inexact: true,
            active: true,
            dry: false,
        }
    }
}

/// Facts reported by `fast info`
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub root: PathBuf,
    pub manifest: Option<PathBuf>,
    pub tool: ManagedTool,
    pub virtual_env: Option<PathBuf>,
    pub version: String,
    pub settings: Settings,
}

/// The project a command operates on
struct Project {
    root: PathBuf,
    manifest: Option<Manifest>,
    tool: ManagedTool,
}

impl Project {
    fn manifest_text(&self) -> &str {
        self.manifest.as_ref().map_or("", |m| m.text.as_str())
    }

    fn require_manifest(&self) -> Result<&Manifest> {
        self.manifest.as_ref().ok_or_else(|| {
            FastDevError::Environment(format!(
                "{} not found! Make sure this is a poetry project.",
                MANIFEST_FILE
            ))
        })
    }
}

pub struct Session<'a> {
    pub cwd: PathBuf,
    pub env: PythonEnv,
    pub settings: Settings,
    pub detection: DetectionOrder,
    executor: &'a dyn Executor,
}

impl<'a> Session<'a> {
    pub fn new(cwd: PathBuf, env: PythonEnv, settings: Settings, executor: &'a dyn Executor) -> Self {
        Self {
            cwd,
            env,
            settings,
            detection: DetectionOrder::default(),
            executor,
        }
    }

    /// Session for the current process: working directory, `VIRTUAL_ENV` and env toggles
    pub fn from_env(executor: &'a dyn Executor) -> Result<Self> {
        Ok(Self::new(
            std::env::current_dir()?,
            PythonEnv::from_env(),
            Settings::from_env(),
            executor,
        ))
    }

    fn project(&self, allow_cwd: bool) -> Result<Project> {
        let root = locate(MANIFEST_FILE, &self.cwd, allow_cwd, &self.env)?;
        let manifest = if root.join(MANIFEST_FILE).exists() {
            Some(Manifest::load(&root)?)
        } else {
            None
        };
        let tool = manifest
            .as_ref()
            .map_or(ManagedTool::None, |m| self.detection.detect(&m.text));
        tracing::debug!(root = %root.display(), %tool, "project");
        Ok(Project { root, manifest, tool })
    }

    fn in_venv(&self) -> bool {
        self.env.is_active()
    }

    /// Whether `program` can be invoked without a runner prefix
    ///
    /// Looks in the active environment first, then asks the program itself.
    fn runnable(&self, program: &str) -> bool {
        if let Some(prefix) = &self.env.prefix {
            let bin = if cfg!(windows) { "Scripts" } else { "bin" };
            if which::which_in(program, Some(prefix.join(bin)), &self.cwd).is_ok() {
                return true;
            }
        }
        self.executor.check(&format!("{} --version", program))
    }

    fn pip_available(&self, runner: Option<&str>) -> bool {
        let pip_version = Command::run_via(runner, "python").args(["-m", "pip", "--version"]);
        self.executor.check(&pip_version.render())
    }

    fn run(&self, plan: &CommandPlan, mode: &ExecMode, out: &mut dyn Write) -> Result<Output> {
        execute(plan, mode, self.executor, out)
    }

    fn resolve_version(&self, project: &Project) -> String {
        let query = VersionQuery {
            root: &project.root,
            manifest_text: project.manifest_text(),
            tool: project.tool,
            package_name: None,
        };
        current_version(&query, self.executor)
    }

    /// Path relative to the working directory when possible, else absolute
    fn display_path(&self, root: &Path, relative: &str) -> String {
        if self.cwd == root {
            relative.to_string()
        } else {
            root.join(relative).to_string_lossy().to_string()
        }
    }

    pub fn bump(&self, req: &BumpRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(false)?;
        let manifest = project.require_manifest()?;
        let current = self.resolve_version(&project);
        let target = version::bump_target(manifest, &project.root, project.tool)?;
        tracing::info!(file = %target, version = %current, "bump target");

        let emoji = req.emoji
            && bump::starts_with_emoji(&self.executor.capture(bump::LAST_COMMIT_MESSAGE_CMD));
        let plan = BumpPlanner {
            current_version: current,
            filename: self.display_path(&project.root, &target),
            part: req.part,
            commit: req.commit,
            emoji,
            push: !self.settings.dont_git_push,
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;

        if !req.commit && !req.dry {
            writeln!(out, "{}", self.bumped_version(&project)?)?;
            if req.part != BumpPart::Patch {
                writeln!(out, "{}", TAG_HINT.yellow())?;
            }
        }
        Ok(())
    }

    /// Version after a bump, read from the rewritten files
    fn bumped_version(&self, project: &Project) -> Result<String> {
        if project.tool == ManagedTool::Poetry {
            return Ok(self.resolve_version(project));
        }
        let mut manifest = project.require_manifest()?.clone();
        manifest.reload()?;
        Ok(version::read_version_from_file(
            &package_name_for(&project.root),
            &project.root,
            &manifest.text,
        ))
    }

    pub fn sync(&self, req: &SyncRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(true)?;
        let in_venv = self.in_venv();
        let runner = if in_venv { None } else { project.tool.runner() };
        let plan = SyncPlanner {
            tool: project.tool,
            filename: req.filename.clone(),
            extras: req.extras.clone(),
            save: req.save,
            in_venv,
            target_exists: self.cwd.join(&req.filename).exists(),
            pip_available: self.pip_available(runner),
            with_dev: should_with_dev(project.manifest_text()),
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        Ok(())
    }

    pub fn upgrade(&self, req: &UpgradeRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(false)?;
        let tool = match &req.tool {
            Some(name) => ManagedTool::from_name(name)?,
            None => project.tool,
        };
        let plan = UpgradePlanner {
            tool,
            manifest_text: project.manifest_text().to_string(),
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        Ok(())
    }

    /// Format and lint, or only verify with `check_only`
    ///
    /// A failing check terminates the process with the tool's exit code.
    pub fn lint(&self, req: &LintRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(true)?;
        let mut settings = self.settings.clone();
        settings.skip_mypy |= req.skip_mypy;

        let planner = LintPlanner {
            paths: req.paths.clone(),
            check_only: req.check_only,
            bandit: req.bandit || self.settings.bandit,
            settings,
            in_venv: self.in_venv(),
            ruff_available: self.runnable("ruff"),
            tool: project.tool,
            has_bandit_config: project
                .manifest
                .as_ref()
                .is_some_and(|m| m.has_table("tool.bandit")),
            package_dir: package_dir(&project.root),
        };
        if planner.needs_install_hint() && self.executor.check(SELF_IMPORT_CMD) {
            writeln!(out, "{}", INSTALL_HINT.yellow())?;
            writeln!(out, "\n  {}\n", INSTALL_COMMAND)?;
        }
        let plan = planner.plan()?;
        let policy = if req.check_only {
            ExitPolicy::Terminate
        } else {
            ExitPolicy::Raise
        };
        self.run(&plan, &ExecMode::dry(req.dry).with_policy(policy), out)?;
        Ok(())
    }

    pub fn tag(&self, req: &TagRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(false)?;
        project.require_manifest()?;
        let git_status = self.executor.capture(GIT_STATUS_CMD);
        let planner = TagPlanner {
            version: self.resolve_version(&project),
            v_prefix: has_v_prefix(&self.executor.capture(GIT_TAGS_CMD)),
            message: req.message.clone(),
            git_status,
        };
        let plan = match planner.plan() {
            Ok(plan) => plan,
            Err(FastDevError::DirtyWorkTree) => {
                writeln!(out, "--> {}", GIT_STATUS_CMD)?;
                writeln!(out, "{}", planner.git_status)?;
                writeln!(out, "{}", DIRTY_TREE_MESSAGE.red())?;
                return Err(FastDevError::DirtyWorkTree);
            }
            Err(e) => return Err(e),
        };
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        if !req.dry {
            let publish = PublishPlanner { tool: project.tool }.plan()?;
            writeln!(out, "{}", PUBLISH_HINT.yellow())?;
            writeln!(out, "\n  {}\n", publish)?;
        }
        Ok(())
    }

    pub fn publish(&self, dry: bool, out: &mut dyn Write) -> Result<()> {
        let project = self.project(true)?;
        let plan = PublishPlanner { tool: project.tool }.plan()?;
        self.run(&plan, &ExecMode::dry(dry), out)?;
        Ok(())
    }

    pub fn dev(&self, req: &DevRequest, out: &mut dyn Write) -> Result<()> {
        let plan = DevServerPlanner {
            target: req.target.clone(),
            port: req.port,
            host: req.host.clone(),
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        Ok(())
    }

    pub fn test(&self, req: &TestRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(true)?;
        let script = if req.ignore_script {
            None
        } else {
            find_test_script(&project.root)
        };
        let coverage_available = script.is_some() || self.runnable("coverage");
        let plan = TestPlanner {
            root: project.root,
            cwd: self.cwd.clone(),
            script,
            in_venv: self.in_venv(),
            coverage_available,
            tool: project.tool,
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        Ok(())
    }

    pub fn deps(&self, req: &DepsRequest, out: &mut dyn Write) -> Result<()> {
        let project = self.project(true)?;
        let files = ProjectFiles::scan(&project.root, project.manifest.as_ref());
        let installer = choose_installer(req.installer, &files, self.settings.skip_uv);
        tracing::debug!(%installer, "installing dependencies");
        let plan = DepsPlanner {
            installer,
            prod: req.prod,
            inexact: req.inexact,
            active: req.active,
            pip_available: installer == Installer::Pip && self.pip_available(None),
        }
        .plan()?;
        self.run(&plan, &ExecMode::dry(req.dry), out)?;
        Ok(())
    }

    /// Run a shell line as given, pipes and redirections included
    pub fn exec(&self, line: &str, dry: bool, out: &mut dyn Write) -> Result<Output> {
        let plan = CommandPlan::Shell(line.to_string());
        self.run(&plan, &ExecMode::dry(dry), out)
    }

    pub fn info(&self) -> Result<ProjectInfo> {
        let project = self.project(true)?;
        let version = if project.manifest.is_some() {
            self.resolve_version(&project)
        } else {
            UNKNOWN_VERSION.to_string()
        };
        Ok(ProjectInfo {
            manifest: project.manifest.as_ref().map(|m| m.path.clone()),
            root: project.root,
            tool: project.tool,
            virtual_env: self.env.prefix.clone(),
            version,
            settings: self.settings.clone(),
        })
    }
}

/// Directory bandit scans when the manifest has no bandit table
fn package_dir(root: &Path) -> String {
    let name = package_name_for(root);
    if !name.is_empty() && root.join(&name).is_dir() {
        name
    } else if root.join("src").is_dir() {
        "src".to_string()
    } else {
        ".".to_string()
    }
}
