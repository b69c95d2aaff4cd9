//! Line-oriented queries over the manifest text
//!
//! The manifest is never parsed as TOML. Every query scans lines, which keeps
//! partial or malformed manifests usable.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::locator::MANIFEST_FILE;

/// Snapshot of a manifest file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub text: String,
}

impl Manifest {
    /// Read `<root>/pyproject.toml`
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path)?;
        Ok(Self { path, text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from(MANIFEST_FILE),
            text: text.into(),
        }
    }

    /// Re-read the file, e.g. after an external tool rewrote it
    pub fn reload(&mut self) -> Result<()> {
        self.text = fs::read_to_string(&self.path)?;
        Ok(())
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }

    /// Whether a `[name]` table header appears
    pub fn has_table(&self, name: &str) -> bool {
        self.contains(&format!("[{}]", name))
    }

    /// Lines belonging to table `[name]`, up to the next table header
    pub fn table_lines(&self, name: &str) -> Vec<&str> {
        let header = format!("[{}]", name);
        let mut lines = self.text.lines().skip_while(|l| l.trim() != header);
        if lines.next().is_none() {
            return Vec::new();
        }
        lines
            .take_while(|l| !is_table_header(l))
            .collect()
    }

    /// Raw value of `key = ...` inside table `[name]`, comments and quotes stripped
    pub fn table_value(&self, name: &str, key: &str) -> Option<String> {
        self.table_lines(name)
            .into_iter()
            .find_map(|line| assignment_value(line, key))
    }

    /// File named by a `version = { ..., path = "<file>" }` line
    pub fn version_path(&self) -> Option<String> {
        const VERSION_KEY: &str = "version = ";
        const PATH_KEY: &str = "path = \"";
        self.text.lines().find_map(|line| {
            let value = line.strip_prefix(VERSION_KEY)?;
            let value = value.split('#').next().unwrap_or_default();
            let (_, rest) = value.split_once(PATH_KEY)?;
            rest.split('"').next().map(str::to_string)
        })
    }

    /// `include` entries of `[tool.poetry].packages`, inline or spread over lines
    pub fn poetry_package_includes(&self) -> Vec<String> {
        const INCLUDE_KEY: &str = "include";
        let lines = self.table_lines("tool.poetry");
        let Some(start) = lines
            .iter()
            .position(|l| assignment_value(l, "packages").is_some())
        else {
            return Vec::new();
        };
        let end = find_array_end(&lines, start);
        let array = lines[start..=end].join("\n");
        array
            .split(INCLUDE_KEY)
            .skip(1)
            .filter_map(|part| {
                let part = part.trim_start().strip_prefix('=')?.trim_start();
                let quote = part.chars().next().filter(|c| *c == '"' || *c == '\'')?;
                part[1..].split(quote).next().map(str::to_string)
            })
            .collect()
    }
}

/// Index of the line closing the array opened on `lines[start]`
///
/// Brackets are counted outside comments; an unclosed array runs to the last line.
fn find_array_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    for (i, line) in lines.iter().enumerate().skip(start) {
        let code = line.split('#').next().unwrap_or_default();
        for c in code.chars() {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return i;
        }
    }
    lines.len().saturating_sub(1)
}

/// Whether `line` opens a new table
pub fn is_table_header(line: &str) -> bool {
    line.trim_start().starts_with('[')
}

/// Value of `key = value` when `line` assigns `key`
pub fn assignment_value(line: &str, key: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix(key)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    Some(clean_value(rest))
}

/// Strip a trailing comment and surrounding quotes from a raw value
pub fn clean_value(raw: &str) -> String {
    raw.split('#')
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == ' ' || c == '\'' || c == '"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r#"
[project]
name = "demo"
version = "1.2.3"  # keep in sync

[tool.poetry]
name = "demo"
version = "0"
packages = [{include = "demo"}, {include = "extra", from = "src"}]

[tool.pdm]
version = { source = "file", path = "demo/__init__.py" }
"#;

    #[test]
    fn test_table_value() {
        let m = Manifest::from_text(TEXT);
        assert_eq!(m.table_value("project", "version").as_deref(), Some("1.2.3"));
        assert_eq!(m.table_value("tool.poetry", "version").as_deref(), Some("0"));
        assert_eq!(m.table_value("tool.uv", "version"), None);
    }

    #[test]
    fn test_table_lines_stop_at_next_header() {
        let m = Manifest::from_text(TEXT);
        let lines = m.table_lines("project");
        assert!(lines.iter().all(|l| !l.contains("packages")));
        assert!(m.has_table("tool.pdm"));
    }

    #[test]
    fn test_version_path() {
        let m = Manifest::from_text(TEXT);
        assert_eq!(m.version_path().as_deref(), Some("demo/__init__.py"));
        assert_eq!(Manifest::from_text("version = \"1.0\"").version_path(), None);
    }

    #[test]
    fn test_poetry_package_includes() {
        let m = Manifest::from_text(TEXT);
        assert_eq!(m.poetry_package_includes(), vec!["demo", "extra"]);
    }

    #[test]
    fn test_poetry_package_includes_multiline() {
        let m = Manifest::from_text(
            "[tool.poetry]\nversion = \"0\"\npackages = [\n    { include = \"mypkg\" },  # main\n    { include = \"other\", from = \"src\" },\n]\ninclude = [\"CHANGELOG.md\"]\n",
        );
        assert_eq!(m.poetry_package_includes(), vec!["mypkg", "other"]);
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value(" '0.1.0' # comment"), "0.1.0");
        assert_eq!(clean_value("\"2.0\""), "2.0");
    }

    #[test]
    fn test_assignment_value_requires_key() {
        assert_eq!(assignment_value("version = \"1\"", "version").as_deref(), Some("1"));
        assert_eq!(assignment_value("name = \"x\"", "version"), None);
    }
}
