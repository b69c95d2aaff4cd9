//! Build and upload a distribution

use crate::error::Result;
use crate::plan::{Command, CommandPlan};
use crate::tool::ManagedTool;

use super::Planner;

#[derive(Debug, Clone, Copy)]
pub struct PublishPlanner {
    pub tool: ManagedTool,
}

impl Planner for PublishPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        let plan = match self.tool {
            ManagedTool::Poetry => Command::new("poetry").args(["publish", "--build"]).into(),
            ManagedTool::Pdm => Command::new("pdm").arg("publish").into(),
            ManagedTool::Uv => CommandPlan::and([
                Command::new("uv").arg("build"),
                Command::new("uv").arg("publish"),
            ]),
            ManagedTool::None => CommandPlan::and([
                Command::new("python").args(["-m", "build"]),
                Command::new("twine").arg("upload"),
            ]),
        };
        Ok(plan)
    }
}
