//! Project root discovery and virtual-environment detection

use std::path::{Path, PathBuf};

use crate::error::{FastDevError, Result};

/// Manifest file that marks a project root
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// How many directories (start included) are searched for the marker
pub const PATH_DEPTH: usize = 5;

/// The Python environment the tool was invoked from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonEnv {
    /// Installation prefix of the activated virtual environment
    pub prefix: Option<PathBuf>,
}

impl PythonEnv {
    /// Detect an activated virtual environment (`VIRTUAL_ENV`)
    pub fn from_env() -> Self {
        let prefix = std::env::var_os("VIRTUAL_ENV")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { prefix }
    }

    pub fn active(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    pub fn inactive() -> Self {
        Self { prefix: None }
    }

    /// Whether commands run inside an activated environment
    pub fn is_active(&self) -> bool {
        self.prefix.is_some()
    }

    /// Directory that contains the environment directory (`<root>/.venv` -> `<root>`)
    fn owner_dir(&self) -> Option<&Path> {
        self.prefix.as_deref().and_then(Path::parent)
    }
}

/// Walk `start` and its ancestors looking for `name`
///
/// Returns the directory containing it. At most `depth` directories are
/// inspected, `start` included.
pub fn find_upwards(name: &str, start: &Path, depth: usize) -> Option<PathBuf> {
    start
        .ancestors()
        .take(depth)
        .find(|dir| dir.join(name).exists())
        .map(Path::to_path_buf)
}

/// Fallback root when no marker is found
///
/// Inside an activated environment whose owning directory contains `cwd`,
/// the owning directory is the root. Otherwise `cwd` itself.
pub fn root_dir(cwd: &Path, env: &PythonEnv) -> PathBuf {
    match env.owner_dir() {
        Some(owner) if cwd.starts_with(owner) => owner.to_path_buf(),
        _ => cwd.to_path_buf(),
    }
}

/// Locate the project directory that holds `name`
pub fn locate(name: &str, cwd: &Path, allow_cwd: bool, env: &PythonEnv) -> Result<PathBuf> {
    if let Some(dir) = find_upwards(name, cwd, PATH_DEPTH) {
        tracing::debug!(root = %dir.display(), "found {}", name);
        return Ok(dir);
    }
    if allow_cwd {
        return Ok(root_dir(cwd, env));
    }
    Err(FastDevError::Environment(format!(
        "{} not found! Make sure this is a poetry project.",
        name
    )))
}
