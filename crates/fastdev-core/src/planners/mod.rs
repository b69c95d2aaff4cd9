//! Command planners, one per developer operation
//!
//! Each planner is a plain struct holding every fact it depends on. `plan()`
//! never touches the filesystem, the environment or a subprocess, so equal
//! inputs always produce the same command line.

pub mod bump;
pub mod deps;
pub mod dev;
pub mod lint;
pub mod publish;
pub mod sync;
pub mod tag;
pub mod upgrade;

use crate::error::Result;
use crate::plan::CommandPlan;

pub use bump::{BumpPart, BumpPlanner};
pub use deps::{DepsPlanner, Installer};
pub use dev::DevServerPlanner;
pub use lint::LintPlanner;
pub use publish::PublishPlanner;
pub use sync::SyncPlanner;
pub use tag::TagPlanner;
pub use test::TestPlanner;
pub use upgrade::UpgradePlanner;

/// Produces the command line for one operation
pub trait Planner {
    fn plan(&self) -> Result<CommandPlan>;
}
