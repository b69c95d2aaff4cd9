//! Command plans: what a planner decides to run
//!
//! A plan is either one program invocation, an ordered sequence of plans
//! joined by a connector, or a raw shell line supplied by the user. Plans
//! render to a single shell string for display and execution; arguments are
//! quoted during rendering, never while planning.

use std::fmt;

/// How the steps of a sequence are chained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// Run the next step only if the previous one succeeded
    And,
}

impl Connector {
    fn as_str(&self) -> &'static str {
        match self {
            Connector::And => " && ",
        }
    }
}

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Invoke `program`, through `<runner> run` when a runner is given
    pub fn run_via(runner: Option<&str>, program: impl Into<String>) -> Self {
        match runner {
            Some(runner) => Self::new(runner).arg("run").arg(program),
            None => Self::new(program),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `arg` only when `cond` holds
    pub fn arg_if(self, cond: bool, arg: impl Into<String>) -> Self {
        if cond {
            self.arg(arg)
        } else {
            self
        }
    }

    pub fn render(&self) -> String {
        std::iter::once(quote(&self.program))
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Command> for CommandPlan {
    fn from(cmd: Command) -> Self {
        CommandPlan::Single(cmd)
    }
}

/// A complete command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    Single(Command),
    Sequence(Vec<CommandPlan>, Connector),
    /// A user-supplied shell line, passed through untouched
    Shell(String),
}

impl CommandPlan {
    /// Chain steps so each runs only if all previous ones succeeded
    pub fn and<I, P>(steps: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<CommandPlan>,
    {
        let mut flat = Vec::new();
        for step in steps {
            match step.into() {
                CommandPlan::Sequence(inner, Connector::And) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        CommandPlan::Sequence(flat, Connector::And)
    }

    /// Every program invocation in execution order
    pub fn commands(&self) -> Vec<&Command> {
        match self {
            CommandPlan::Single(cmd) => vec![cmd],
            CommandPlan::Sequence(steps, _) => steps.iter().flat_map(|s| s.commands()).collect(),
            CommandPlan::Shell(_) => Vec::new(),
        }
    }

    /// Render the plan as the shell line that will be executed
    pub fn render(&self) -> String {
        match self {
            CommandPlan::Single(cmd) => cmd.render(),
            CommandPlan::Sequence(steps, connector) => steps
                .iter()
                .map(|s| s.render())
                .collect::<Vec<_>>()
                .join(connector.as_str()),
            CommandPlan::Shell(line) => line.clone(),
        }
    }
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a word for POSIX sh if it contains anything the shell would interpret
pub fn quote(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    let safe = word
        .chars()
        .all(|c| c.is_alphanumeric() || "-_./=:,@+%^".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("poetry"), "poetry");
        assert_eq!(quote("--port=9000"), "--port=9000");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("typer[all]@latest"), "'typer[all]@latest'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote("tests/*"), "'tests/*'");
    }

    #[test]
    fn test_render_single() {
        let cmd = Command::new("git").args(["tag", "-a", "v1.0.0", "-m", ""]);
        assert_eq!(cmd.render(), "git tag -a v1.0.0 -m ''");
    }

    #[test]
    fn test_and_flattens_nested_sequences() {
        let a = CommandPlan::and([Command::new("a"), Command::new("b")]);
        let plan = CommandPlan::and([a, Command::new("c").into()]);
        assert_eq!(plan.commands().len(), 3);
        assert_eq!(plan.render(), "a && b && c");
    }

    #[test]
    fn test_single_step_sequence_collapses() {
        let plan = CommandPlan::and([Command::new("ruff").arg("check")]);
        assert!(matches!(plan, CommandPlan::Single(_)));
    }

    #[test]
    fn test_run_via() {
        assert_eq!(Command::run_via(Some("pdm"), "mypy").arg(".").render(), "pdm run mypy .");
        assert_eq!(Command::run_via(None, "mypy").arg(".").render(), "mypy .");
    }

    #[test]
    fn test_shell_passthrough() {
        let plan = CommandPlan::Shell("echo hello|grep h".to_string());
        assert_eq!(plan.to_string(), "echo hello|grep h");
        assert!(plan.commands().is_empty());
    }
}
