//! Current-version resolution and bump-target selection
//!
//! Resolution is best effort: anything that cannot be found degrades to a
//! warning and the `0.0.0` sentinel so read-only commands keep working.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;

use crate::error::{FastDevError, Result};
use crate::exec::Executor;
use crate::locator::MANIFEST_FILE;
use crate::manifest::{clean_value, Manifest};
use crate::tool::ManagedTool;

/// Returned when no version could be found anywhere
pub const UNKNOWN_VERSION: &str = "0.0.0";

const PLACEHOLDERS: [&str; 2] = ["0", "0.0.0"];
const INIT_FILE: &str = "__init__.py";

static MANIFEST_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^version\s*=").unwrap());
static DUNDER_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__version__\s*=").unwrap());
static DUNDER_VERSION_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"__version__\s*=\s*['"]"#).unwrap());
static SEMVER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+").unwrap());

/// Whether `version` marks "look elsewhere" rather than a real version
pub fn is_placeholder(version: &str) -> bool {
    PLACEHOLDERS.contains(&version)
}

/// Package directory name derived from the project directory name
pub fn package_name_for(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().replace(['-', ' '], "_"))
        .unwrap_or_default()
}

fn parse_version_line(line: &str, pattern: &Regex) -> Option<String> {
    let m = pattern.find(line)?;
    Some(clean_value(&line[m.end()..]))
}

/// First existing `__init__.py` among the conventional package locations
pub fn find_init_file(package_name: &str, work_dir: &Path) -> Option<PathBuf> {
    [
        work_dir.join(package_name).join(INIT_FILE),
        work_dir.join("src").join(package_name).join(INIT_FILE),
        work_dir.join("app").join(INIT_FILE),
    ]
    .into_iter()
    .find(|p| p.exists())
}

/// Version from the manifest text, falling back to the package `__init__.py`
pub fn read_version_from_file(package_name: &str, work_dir: &Path, manifest_text: &str) -> String {
    for line in manifest_text.lines() {
        if let Some(version) = parse_version_line(line, &MANIFEST_VERSION) {
            if version.starts_with('{') || is_placeholder(&version) {
                break;
            }
            return version;
        }
    }

    let Some(init_file) = find_init_file(package_name, work_dir) else {
        warn("WARNING: __init__.py file does not exist!");
        return UNKNOWN_VERSION.to_string();
    };
    tracing::debug!(file = %init_file.display(), "reading __version__");
    let content = fs::read_to_string(&init_file).unwrap_or_default();
    content
        .lines()
        .find_map(|line| parse_version_line(line, &DUNDER_VERSION))
        .unwrap_or_else(|| {
            warn(&format!(
                "WARNING: can not find '__version__' var in {}!",
                init_file.display()
            ));
            UNKNOWN_VERSION.to_string()
        })
}

fn warn(message: &str) {
    eprintln!("{}", message.yellow());
}

/// Inputs for resolving the current version
pub struct VersionQuery<'a> {
    pub root: &'a Path,
    pub manifest_text: &'a str,
    pub tool: ManagedTool,
    /// Installed distribution name; defaults to the root directory name
    pub package_name: Option<&'a str>,
}

/// Command printing the version through the tool's own subcommand
pub const POETRY_VERSION_CMD: &str = "poetry version -s";

/// Resolve the project's current version
///
/// Poetry projects ask poetry. Everything else tries installed package
/// metadata first, then scans the manifest and package files.
pub fn current_version(query: &VersionQuery<'_>, executor: &dyn Executor) -> String {
    if query.tool == ManagedTool::Poetry {
        let out = executor.capture(POETRY_VERSION_CMD);
        return out
            .lines()
            .last()
            .and_then(|l| l.split_whitespace().last())
            .unwrap_or_default()
            .to_string();
    }

    let package_name = query
        .package_name
        .map(str::to_string)
        .unwrap_or_else(|| package_name_for(query.root));
    let lookup = format!(
        "python -c \"import importlib.metadata as m;print(m.version('{}'))\"",
        package_name
    );
    let installed = executor.capture(&lookup);
    if !installed.is_empty() && SEMVER.is_match(&installed) {
        return installed;
    }
    read_version_from_file(&package_name, query.root, query.manifest_text)
}

/// File the version-bump tool should rewrite, relative to `root`
pub fn bump_target(manifest: &Manifest, root: &Path, tool: ManagedTool) -> Result<String> {
    if let Some(version) = manifest.table_value("project", "version") {
        if SEMVER.is_match(&version) {
            return Ok(MANIFEST_FILE.to_string());
        }
    }

    let Some(poetry_version) = manifest.table_value("tool.poetry", "version") else {
        if tool != ManagedTool::Poetry {
            if let Some(path) = manifest.version_path() {
                if root.join(&path).exists() {
                    return Ok(path);
                }
            }
        }
        return Ok(MANIFEST_FILE.to_string());
    };

    if !is_placeholder(&poetry_version) {
        return Ok(MANIFEST_FILE.to_string());
    }

    // Version kept in the package, e.g. by poetry-version-plugin
    let mut candidates: Vec<PathBuf> = manifest
        .poetry_package_includes()
        .into_iter()
        .map(|p| root.join(p))
        .collect();
    candidates.push(root.join(package_name_for(root)));
    candidates.push(root.to_path_buf());

    for dir in candidates {
        let init_file = dir.join(INIT_FILE);
        let defines_version = fs::read_to_string(&init_file)
            .map(|text| DUNDER_VERSION_LITERAL.is_match(&text))
            .unwrap_or(false);
        if defines_version {
            let relative = init_file.strip_prefix(root).unwrap_or(&init_file);
            return Ok(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Err(FastDevError::VersionFile(
        "Version file not found! Where are you now?".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeExecutor;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_version_wins() {
        let dir = tempdir().unwrap();
        let text = "[project]\nversion = \"0.3.1\"  # current\n";
        assert_eq!(read_version_from_file("demo", dir.path(), text), "0.3.1");
    }

    #[test]
    fn test_placeholder_falls_back_to_init_file() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("demo");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join(INIT_FILE), "__version__ = '0.2.0'  # bumped\n").unwrap();

        for text in ["version = \"0\"", "version = \"0.0.0\"", "version = {attr = \"x\"}"] {
            assert_eq!(read_version_from_file("demo", dir.path(), text), "0.2.0");
        }
    }

    #[test]
    fn test_src_and_app_layouts() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join(INIT_FILE), "__version__ = \"1.0.0\"\n").unwrap();
        assert_eq!(read_version_from_file("demo", dir.path(), ""), "1.0.0");

        let src = dir.path().join("src/demo");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join(INIT_FILE), "__version__ = \"2.0.0\"\n").unwrap();
        assert_eq!(read_version_from_file("demo", dir.path(), ""), "2.0.0");
    }

    #[test]
    fn test_missing_everything_returns_sentinel() {
        let dir = tempdir().unwrap();
        assert_eq!(read_version_from_file("demo", dir.path(), ""), UNKNOWN_VERSION);

        let pkg = dir.path().join("demo");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join(INIT_FILE), "VERSION = 1\n").unwrap();
        assert_eq!(read_version_from_file("demo", dir.path(), ""), UNKNOWN_VERSION);
    }

    #[test]
    fn test_current_version_poetry_uses_last_token() {
        let exec = FakeExecutor::default().respond(
            POETRY_VERSION_CMD,
            0,
            "Some plugin warning\ndemo 0.4.2\n",
        );
        let dir = tempdir().unwrap();
        let query = VersionQuery {
            root: dir.path(),
            manifest_text: "",
            tool: ManagedTool::Poetry,
            package_name: None,
        };
        assert_eq!(current_version(&query, &exec), "0.4.2");
    }

    #[test]
    fn test_current_version_is_idempotent() {
        let dir = tempdir().unwrap();
        let exec = FakeExecutor::default();
        let query = VersionQuery {
            root: dir.path(),
            manifest_text: "[project]\nversion = \"0.1.0\"\n",
            tool: ManagedTool::Pdm,
            package_name: Some("demo"),
        };
        let first = current_version(&query, &exec);
        assert_eq!(first, "0.1.0");
        assert_eq!(current_version(&query, &exec), first);
    }

    #[test]
    fn test_current_version_prefers_installed_metadata() {
        let dir = tempdir().unwrap();
        let lookup = "python -c \"import importlib.metadata as m;print(m.version('demo'))\"";
        let exec = FakeExecutor::default().respond(lookup, 0, "3.1.4\n");
        let query = VersionQuery {
            root: dir.path(),
            manifest_text: "version = \"0.1.0\"",
            tool: ManagedTool::Uv,
            package_name: Some("demo"),
        };
        assert_eq!(current_version(&query, &exec), "3.1.4");
    }

    #[test]
    fn test_bump_target_project_version() {
        let dir = tempdir().unwrap();
        let m = Manifest::from_text("[project]\nname = \"x\"\nversion = \"0.1.0\"\n");
        assert_eq!(bump_target(&m, dir.path(), ManagedTool::Pdm).unwrap(), MANIFEST_FILE);
    }

    #[test]
    fn test_bump_target_dynamic_version_path() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("demo")).unwrap();
        fs::write(dir.path().join("demo/__init__.py"), "__version__ = '0.1.0'\n").unwrap();
        let m = Manifest::from_text(
            "[project]\ndynamic = [\"version\"]\n\n[tool.pdm]\nversion = { source = \"file\", path = \"demo/__init__.py\" }\n",
        );
        assert_eq!(
            bump_target(&m, dir.path(), ManagedTool::Pdm).unwrap(),
            "demo/__init__.py"
        );
    }

    #[test]
    fn test_bump_target_poetry_placeholder() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("hello-world");
        fs::create_dir_all(root.join("hello_world")).unwrap();
        fs::write(root.join("hello_world/__init__.py"), "__version__ = \"0.0.1\"\n").unwrap();
        let m = Manifest::from_text("[tool.poetry]\nname = \"hello-world\"\nversion = \"0\"\n");
        assert_eq!(
            bump_target(&m, &root, ManagedTool::Poetry).unwrap(),
            "hello_world/__init__.py"
        );

        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let err = bump_target(&m, &empty, ManagedTool::Poetry).unwrap_err();
        assert!(matches!(err, FastDevError::VersionFile(_)));

        let app = dir.path().join("app");
        fs::create_dir_all(app.join("mypkg")).unwrap();
        fs::write(app.join("mypkg/__init__.py"), "__version__ = \"0.1.0\"\n").unwrap();
        let spread = Manifest::from_text(
            "[tool.poetry]\nversion = \"0\"\npackages = [\n    { include = \"mypkg\" },\n]\n",
        );
        assert_eq!(
            bump_target(&spread, &app, ManagedTool::Poetry).unwrap(),
            "mypkg/__init__.py"
        );
    }

    #[test]
    fn test_bump_target_poetry_concrete_version() {
        let dir = tempdir().unwrap();
        let m = Manifest::from_text("[tool.poetry]\nversion = \"0.8.0\"\n");
        assert_eq!(bump_target(&m, dir.path(), ManagedTool::Poetry).unwrap(), MANIFEST_FILE);
    }

    #[test]
    fn test_package_name_for() {
        assert_eq!(package_name_for(Path::new("/x/fast-dev cli")), "fast_dev_cli");
    }
}
