//! Annotated git tag for the current version

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FastDevError, Result};
use crate::plan::{Command, CommandPlan};

use super::Planner;

pub const GIT_STATUS_CMD: &str = "git status";
pub const GIT_TAGS_CMD: &str = "git tag";
pub const DIRTY_TREE_MESSAGE: &str =
    "ERROR: Please run git commit to make sure working tree is clean!";

static CLEAN_TREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"working (tree|directory) clean|无文件要提交，干净的工作区").unwrap());

/// Whether `git status` output reports nothing to commit
pub fn is_clean_tree(git_status: &str) -> bool {
    CLEAN_TREE.is_match(git_status)
}

/// Whether existing tags follow the `v1.2.3` convention
pub fn has_v_prefix(git_tags: &str) -> bool {
    git_tags.contains('v')
}

#[derive(Debug, Clone)]
pub struct TagPlanner {
    pub version: String,
    pub v_prefix: bool,
    /// Annotation message, may be empty
    pub message: String,
    /// Output of `git status`
    pub git_status: String,
}

impl TagPlanner {
    pub fn tag_name(&self) -> String {
        if self.v_prefix {
            format!("v{}", self.version)
        } else {
            self.version.clone()
        }
    }
}

impl Planner for TagPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        if !is_clean_tree(&self.git_status) {
            return Err(FastDevError::DirtyWorkTree);
        }
        let mut steps = vec![
            Command::new("git").args(["tag", "-a", &self.tag_name(), "-m", &self.message]),
            Command::new("git").args(["push", "--tags"]),
        ];
        // "use \"git push\" to publish your local commits"
        if self.git_status.contains("git push") {
            steps.push(Command::new("git").arg("push"));
        }
        Ok(CommandPlan::and(steps))
    }
}
