//! Environment-variable configuration
//!
//! Every toggle is coerced to its effective boolean once, when `Settings` is
//! built. Planners only ever see plain `bool` fields.

use colored::Colorize;
use serde::Serialize;

pub const NO_FIX: &str = "NO_FIX";
pub const SKIP_MYPY: &str = "SKIP_MYPY";
pub const NO_DMYPY: &str = "NO_DMYPY";
pub const IGNORE_MISSING_IMPORTS: &str = "IGNORE_MISSING_IMPORTS";
pub const DONT_GIT_PUSH: &str = "DONT_GIT_PUSH";
pub const BANDIT: &str = "FASTDEVCLI_BANDIT";
pub const SKIP_UV: &str = "FASTDEVCLI_SKIP_UV";

/// Effective configuration for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Lint never passes `--fix` to ruff
    pub no_fix: bool,
    /// Drop the type checker from lint/check
    pub skip_mypy: bool,
    /// Never switch mypy to its daemon mode
    pub no_dmypy: bool,
    /// Pass `--ignore-missing-imports` to mypy
    pub ignore_missing_imports: bool,
    /// Committing bump does not push
    pub dont_git_push: bool,
    /// Append a bandit scan to lint/check
    pub bandit: bool,
    /// Dependency install does not prefer uv
    pub skip_uv: bool,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| parse_bool(name, lookup(name).as_deref(), false);
        Self {
            no_fix: get(NO_FIX),
            skip_mypy: get(SKIP_MYPY),
            no_dmypy: get(NO_DMYPY),
            ignore_missing_imports: get(IGNORE_MISSING_IMPORTS),
            dont_git_push: get(DONT_GIT_PUSH),
            bandit: get(BANDIT),
            skip_uv: get(SKIP_UV),
        }
    }
}

/// Coerce a raw configuration value to its effective boolean
///
/// Unset or empty values yield `default`. Unrecognized values warn and
/// yield `default` as well.
pub fn parse_bool(name: &str, value: Option<&str>, default: bool) -> bool {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return default;
    };
    match raw.to_lowercase().as_str() {
        "0" | "false" | "f" | "off" | "no" | "n" => false,
        "1" | "true" | "t" | "on" | "yes" | "y" => true,
        _ => {
            tracing::warn!(var = name, value = raw, "unrecognized boolean value");
            eprintln!(
                "{}",
                format!("WARNING: can not convert value({:?}) of {} to bool!", raw, name)
                    .yellow()
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_bool_falsy() {
        for v in ["0", "false", "False", "FALSE", "f", "off", "OFF", "no", "NO", "n"] {
            assert!(!parse_bool("X", Some(v), true), "{v} should be false");
        }
    }

    #[test]
    fn test_parse_bool_truthy() {
        for v in ["1", "true", "t", "on", "yes", "Y"] {
            assert!(parse_bool("X", Some(v), false), "{v} should be true");
        }
    }

    #[test]
    fn test_parse_bool_default() {
        assert!(!parse_bool("X", None, false));
        assert!(parse_bool("X", None, true));
        assert!(parse_bool("X", Some(""), true));
        assert!(!parse_bool("X", Some("yeah"), false));
        assert!(parse_bool("X", Some("yeah"), true));
    }

    #[test]
    fn test_settings_from_lookup() {
        let env: HashMap<&str, &str> =
            HashMap::from([(NO_FIX, "1"), (SKIP_MYPY, "0"), (BANDIT, "yes")]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(settings.no_fix);
        assert!(!settings.skip_mypy);
        assert!(settings.bandit);
        assert!(!settings.dont_git_push);
    }
}
