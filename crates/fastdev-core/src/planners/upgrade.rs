//! Upgrade every dependency to its latest release
//!
//! Poetry projects get one `poetry add <pkg>@latest ...` per group of
//! dependencies sharing the same qualifiers. uv and pdm have native upgrade
//! commands.

use crate::error::{FastDevError, Result};
use crate::plan::{Command, CommandPlan};
use crate::tool::ManagedTool;

use super::Planner;

const MAIN_TITLE: &str = "[tool.poetry.dependencies]";

/// Dev-dependency table spelling, by poetry schema generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevFlag {
    /// `[tool.poetry.group.dev.dependencies]`, poetry >= 1.2
    Group,
    /// `[tool.poetry.dev-dependencies]`
    Legacy,
}

impl DevFlag {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Group => "[tool.poetry.group.dev.dependencies]",
            Self::Legacy => "[tool.poetry.dev-dependencies]",
        }
    }

    /// Arguments passed to `poetry add` for dev dependencies
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Self::Group => &["--group", "dev"],
            Self::Legacy => &["--dev"],
        }
    }
}

/// Whether the manifest declares poetry dev dependencies in either spelling
pub fn should_with_dev(text: &str) -> bool {
    text.contains(DevFlag::Group.title()) || text.contains(DevFlag::Legacy.title())
}

/// Pick out the value for `key` in an inline dependency spec
///
/// `{extras = ["all"], version = "^0.9.0"}` gives `all` for `extras` and
/// `^0.9.0` for `version`.
pub fn parse_value(version_info: &str, key: &str) -> String {
    let sep = format!("{} = ", key);
    let rest = version_info
        .split_once(&sep)
        .map_or(version_info, |(_, r)| r)
        .trim_matches(|c| c == ' ' || c == '=');
    let value = if let Some(list) = rest.strip_prefix('[') {
        list.split(']').next().unwrap_or_default()
    } else if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next().unwrap_or_default()
    } else {
        rest.split(',').next().unwrap_or_default().split('}').next().unwrap_or_default()
    };
    value.trim().replace('"', "")
}

/// Whether a dependency is already unconstrained, pinned or not upgradable
pub fn no_need_upgrade(version_info: &str, line: &str) -> bool {
    let mut v = version_info.replace(' ', "");
    if v.starts_with("{url=") {
        tracing::info!(line, "no need to upgrade");
        return true;
    }
    if let Some((_, after)) = v.split_once("version=") {
        v = after
            .trim_matches('"')
            .split('"')
            .next()
            .unwrap_or_default()
            .to_string();
    }
    let skip = v == "*"
        || v == "["
        || v.starts_with('>')
        || v.starts_with('<')
        || v.chars().next().is_some_and(|c| c.is_ascii_digit());
    if skip {
        tracing::info!(line, "skip dependency");
    }
    skip
}

/// Dependencies partitioned into a plain list and qualifier groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyArgs {
    /// `<name>[extras]@latest` entries without qualifiers
    pub plain: Vec<String>,
    /// Qualifier arguments and the entries sharing exactly those qualifiers,
    /// in first-seen order
    pub groups: Vec<(Vec<String>, Vec<String>)>,
}

impl DependencyArgs {
    fn add_to_group(&mut self, key: Vec<String>, item: String) {
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(item),
            None => self.groups.push((key, vec![item])),
        }
    }
}

/// Turn dependency table lines into `poetry add` arguments
pub fn build_args(package_lines: &[&str]) -> Result<DependencyArgs> {
    let mut args = DependencyArgs::default();
    for (no, line) in package_lines.iter().enumerate() {
        let m = line.trim();
        if m.is_empty()
            || m.starts_with('#')
            || m == "]"
            || (m.starts_with('{') && m.trim_end_matches(',').ends_with('}'))
        {
            continue;
        }
        let Some((package, version_info)) = m.split_once('=') else {
            return Err(FastDevError::Parse {
                line: no + 1,
                content: m.to_string(),
            });
        };
        let mut package = package.trim().to_string();
        if package.eq_ignore_ascii_case("python") {
            continue;
        }
        let version_info = version_info.trim_matches(|c| c == ' ' || c == '"');
        if no_need_upgrade(version_info, line) {
            continue;
        }
        if version_info.contains("extras") {
            package = format!("{}[{}]", package, parse_value(version_info, "extras"));
        }
        let item = format!("{}@latest", package);

        let mut key = Vec::new();
        for qualifier in ["platform", "source"] {
            if version_info.contains(qualifier) {
                key.push(format!("--{}={}", qualifier, parse_value(version_info, qualifier)));
            }
        }
        if version_info.contains("optional = true") {
            key.push("--optional".to_string());
        }

        if key.is_empty() {
            args.plain.push(item);
        } else {
            args.add_to_group(key, item);
        }
    }
    Ok(args)
}

/// Non-empty lines of the first table in `toml_str`
pub fn parse_item(toml_str: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    for line in toml_str.lines().map(str::trim) {
        if line.starts_with('[') {
            if !lines.is_empty() {
                break;
            }
        } else if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Everything needed to render the poetry add-commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetryUpgrade {
    pub main: Vec<String>,
    pub dev: Vec<String>,
    /// Full argument lists for qualified groups, dev flag included for dev groups
    pub others: Vec<Vec<String>>,
    pub dev_flag: DevFlag,
}

impl PoetryUpgrade {
    /// Collect add-command arguments from manifest text
    pub fn from_manifest(text: &str) -> Result<Self> {
        let Some((_, text)) = text.rsplit_once(MAIN_TITLE) else {
            return Err(FastDevError::Environment(format!(
                "{} not found! Make sure this is a poetry project.",
                MAIN_TITLE
            )));
        };
        let dev_flag = if text.contains(DevFlag::Group.title()) {
            DevFlag::Group
        } else {
            DevFlag::Legacy
        };
        let parts: Vec<&str> = text.split(dev_flag.title()).collect();
        let (main_toml, dev_toml) = match parts.as_slice() {
            [main, dev] => (*main, *dev),
            _ => (text, ""),
        };

        let main = build_args(&parse_item(main_toml))?;
        let dev = build_args(&parse_item(dev_toml))?;

        let mut others: Vec<Vec<String>> = main
            .groups
            .into_iter()
            .map(|(key, items)| key.into_iter().chain(items).collect())
            .collect();
        others.extend(dev.groups.into_iter().map(|(key, items)| {
            key.into_iter()
                .chain(items)
                .chain(dev_flag.args().iter().map(|s| s.to_string()))
                .collect()
        }));

        Ok(Self {
            main: main.plain,
            dev: dev.plain,
            others,
            dev_flag,
        })
    }

    /// The chained `poetry add` commands, without lock/update
    pub fn add_commands(&self) -> Vec<CommandPlan> {
        let add = || Command::new("poetry").arg("add");
        let mut steps = Vec::new();
        if !self.main.is_empty() {
            steps.push(add().args(&self.main).into());
        }
        if !self.dev.is_empty() {
            steps.push(add().args(self.dev_flag.args().iter().copied()).args(&self.dev).into());
        }
        steps.extend(self.others.iter().map(|single| add().args(single).into()));
        steps
    }
}

#[derive(Debug, Clone)]
pub struct UpgradePlanner {
    pub tool: ManagedTool,
    pub manifest_text: String,
}

impl Planner for UpgradePlanner {
    fn plan(&self) -> Result<CommandPlan> {
        match self.tool {
            ManagedTool::Uv => Ok(CommandPlan::and([
                Command::new("uv").args(["lock", "--upgrade", "--verbose"]),
                Command::new("uv").args(["sync", "--frozen"]),
            ])),
            ManagedTool::Pdm => Ok(CommandPlan::and([
                Command::new("pdm").args(["update", "--verbose"]),
                Command::new("pdm").arg("install"),
            ])),
            ManagedTool::Poetry => {
                let mut steps = PoetryUpgrade::from_manifest(&self.manifest_text)?.add_commands();
                steps.push(Command::new("poetry").arg("lock").into());
                steps.push(Command::new("poetry").arg("update").into());
                Ok(CommandPlan::and(steps))
            }
            ManagedTool::None => Err(FastDevError::Environment(
                "There project is not managed by uv/pdm/poetry!".to_string(),
            )),
        }
    }
}
