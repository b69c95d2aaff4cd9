//! Install the project and its development dependencies

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::plan::{Command, CommandPlan};

use super::Planner;

/// Installer used by `fast deps`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installer {
    Uv,
    Pdm,
    Poetry,
    Pip,
}

impl fmt::Display for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uv => "uv",
            Self::Pdm => "pdm",
            Self::Poetry => "poetry",
            Self::Pip => "pip",
        };
        f.write_str(name)
    }
}

/// Lock files and manifest present in the project root
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectFiles<'a> {
    pub manifest: Option<&'a Manifest>,
    pub uv_lock: bool,
    pub pdm_lock: bool,
    pub poetry_lock: bool,
}

impl<'a> ProjectFiles<'a> {
    pub fn scan(root: &Path, manifest: Option<&'a Manifest>) -> Self {
        Self {
            manifest,
            uv_lock: root.join("uv.lock").exists(),
            pdm_lock: root.join("pdm.lock").exists(),
            poetry_lock: root.join("poetry.lock").exists(),
        }
    }
}

/// Pick the installer: an explicit choice wins, then lock files and markers
pub fn choose_installer(explicit: Option<Installer>, files: &ProjectFiles<'_>, skip_uv: bool) -> Installer {
    if let Some(installer) = explicit {
        return installer;
    }
    let Some(manifest) = files.manifest else {
        return Installer::Pip;
    };
    if files.uv_lock && !skip_uv {
        Installer::Uv
    } else if files.pdm_lock || manifest.contains("[tool.pdm]") {
        Installer::Pdm
    } else if files.poetry_lock || manifest.contains("[tool.poetry]") {
        Installer::Poetry
    } else {
        Installer::Uv
    }
}

#[derive(Debug, Clone)]
pub struct DepsPlanner {
    pub installer: Installer,
    /// Production dependencies only
    pub prod: bool,
    /// uv: keep packages that are not in the lock file
    pub inexact: bool,
    /// uv: install into the active environment instead of `.venv`
    pub active: bool,
    /// `python -m pip` already works, skip bootstrapping it
    pub pip_available: bool,
}

impl Default for DepsPlanner {
    fn default() -> Self {
        Self {
            installer: Installer::Uv,
            prod: false,
            inexact: true,
            active: true,
            pip_available: false,
        }
    }
}

impl DepsPlanner {
    /// Arguments that depend on `--prod`
    fn scope_args(&self) -> &'static [&'static str] {
        match (self.installer, self.prod) {
            (Installer::Uv | Installer::Poetry, false) => &["--all-extras", "--all-groups"],
            (Installer::Uv | Installer::Pip, true) => &[],
            (Installer::Pdm, false) => &["-G", ":all"],
            (Installer::Pdm, true) => &["--prod"],
            (Installer::Poetry, true) => &["--only=main"],
            (Installer::Pip, false) => &["--group", "dev"],
        }
    }
}

impl Planner for DepsPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        let scope = self.scope_args().iter().copied();
        let plan = match self.installer {
            Installer::Uv => Command::new("uv")
                .arg("sync")
                .arg_if(self.inexact, "--inexact")
                .arg_if(self.active, "--active")
                .args(scope)
                .into(),
            Installer::Pdm => Command::new("pdm").args(["install", "--frozen"]).args(scope).into(),
            Installer::Poetry => Command::new("poetry").arg("install").args(scope).into(),
            Installer::Pip => {
                let pip = || Command::new("python").args(["-m", "pip"]);
                let mut steps = Vec::new();
                if !self.pip_available {
                    steps.push(Command::new("python").args(["-m", "ensurepip"]));
                    steps.push(pip().args(["install", "--upgrade", "pip"]));
                }
                steps.push(pip().args(["install", "-e", "."]).args(scope));
                CommandPlan::and(steps)
            }
        };
        Ok(plan)
    }
}
