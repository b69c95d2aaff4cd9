//! fastdev-core - Command synthesis for Python project workflows
//!
//! Inspects a project (manifest, dependency manager, version, environment)
//! and turns each developer operation into a single shell command line.

pub mod config;
pub mod error;
pub mod exec;
pub mod locator;
pub mod manifest;
pub mod plan;
pub mod planners;
pub mod session;
pub mod tool;
pub mod version;

pub use config::Settings;
pub use error::{FastDevError, Result};
pub use exec::{execute, ExecMode, ExitPolicy, Executor, Output, RunOptions, ShellExecutor};
pub use locator::PythonEnv;
pub use plan::{Command, CommandPlan};
pub use session::Session;
pub use tool::ManagedTool;
