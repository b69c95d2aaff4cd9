//! Version bump via `bumpversion`

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{FastDevError, Result};
use crate::plan::{Command, CommandPlan};

use super::Planner;

/// Which component of `major.minor.patch` to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BumpPart {
    Patch,
    Minor,
    Major,
}

/// Declared order; position + 1 is the numeric alias
const PART_ORDER: [BumpPart; 3] = [BumpPart::Patch, BumpPart::Minor, BumpPart::Major];

static PART_LOOKUP: LazyLock<HashMap<String, BumpPart>> = LazyLock::new(|| {
    PART_ORDER
        .iter()
        .enumerate()
        .flat_map(|(i, part)| [((i + 1).to_string(), *part), (part.as_str().to_string(), *part)])
        .collect()
});

impl BumpPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// Accepts `patch`/`minor`/`major` or the aliases `1`/`2`/`3`
    pub fn parse(s: &str) -> Result<Self> {
        PART_LOOKUP
            .get(s.trim())
            .copied()
            .ok_or_else(|| FastDevError::InvalidInput(format!("Invalid part: {:?}", s)))
    }
}

impl fmt::Display for BumpPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PARSE_PATTERN: &str = r"(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)";

/// Plans `bumpversion` plus the optional commit/push chain
#[derive(Debug, Clone)]
pub struct BumpPlanner {
    pub current_version: String,
    /// File rewritten by bumpversion, relative to the project root
    pub filename: String,
    pub part: BumpPart,
    pub commit: bool,
    /// Last commit message starts with an emoji
    pub emoji: bool,
    /// Push commits and tags after committing
    pub push: bool,
}

impl Planner for BumpPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        let bump = Command::new("bumpversion")
            .args(["--parse", PARSE_PATTERN])
            .arg(format!("--current-version={}", self.current_version))
            .arg(self.part.as_str())
            .arg(&self.filename);

        if !self.commit {
            return Ok(bump.arg("--allow-dirty").into());
        }

        let bump = bump
            .arg_if(self.part != BumpPart::Patch, "--tag")
            .arg("--commit")
            .arg_if(self.emoji, "--message-emoji=1");
        if !self.push {
            return Ok(bump.into());
        }
        Ok(CommandPlan::and([
            bump,
            Command::new("git").arg("push"),
            Command::new("git").args(["push", "--tags"]),
            Command::new("git").args(["log", "-1"]),
        ]))
    }
}

/// Command that prints the subject of the last commit
pub const LAST_COMMIT_MESSAGE_CMD: &str = "git show --pretty=format:\"%s\" -s HEAD";

/// Whether a commit message begins with an emoji
pub fn starts_with_emoji(message: &str) -> bool {
    let Some(first) = message.trim_start_matches('"').chars().next() else {
        return false;
    };
    let mut candidate = String::from(first);
    if emojis::get(&candidate).is_some() {
        return true;
    }
    candidate.push('\u{FE0F}');
    emojis::get(&candidate).is_some()
}
