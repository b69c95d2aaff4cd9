//! CLI command definitions and handlers

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use fastdev_core::planners::sync::DEFAULT_REQUIREMENTS;
use fastdev_core::planners::{BumpPart, Installer};
use fastdev_core::session::{
    BumpRequest, DepsRequest, DevRequest, LintRequest, ProjectInfo, SyncRequest, TagRequest,
    TestRequest, UpgradeRequest,
};
use fastdev_core::{Session, ShellExecutor};

/// fast - One command for the Python project lifecycle
#[derive(Parser)]
#[command(name = "fast")]
#[command(version)]
#[command(about = "Bump, sync, upgrade, lint, test, tag and publish Python projects")]
#[command(after_help = "\
EXAMPLES:
    fast bump patch            Bump the patch version in place
    fast bump minor --commit   Bump, commit, tag and push
    fast sync                  Install locked dependencies with pip
    fast upgrade               Upgrade every dependency to its latest release
    fast lint                  Format, lint and type-check the project
    fast check                 Verify formatting and lint without fixing
    fast test                  Run tests with coverage
    fast tag                   Tag the current version and push the tag
    fast upload                Build and publish the package
    fast dev 9000              Start the fastapi dev server on port 9000
    fast exec 'ls | wc -l'     Run any shell line

Every command accepts --dry to print the command without running it.

ENVIRONMENT:
    NO_FIX, SKIP_MYPY, NO_DMYPY, IGNORE_MISSING_IMPORTS, DONT_GIT_PUSH,
    FASTDEVCLI_BANDIT, FASTDEVCLI_SKIP_UV (accept 1/0, true/false, on/off, yes/no)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Copy)]
pub struct DryArg {
    /// Only print, not really run shell command
    #[arg(long)]
    pub dry: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bump the project version
    Bump {
        /// patch/minor/major, or 1/2/3
        part: Option<String>,

        /// Commit the change (and tag for minor/major)
        #[arg(short, long)]
        commit: bool,

        /// Do not add --message-emoji even if the last commit starts with one
        #[arg(long)]
        no_emoji: bool,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Export dependencies to a requirements file and install them with pip
    Sync {
        #[arg(default_value = DEFAULT_REQUIREMENTS)]
        filename: String,

        /// Extras to include in the export
        #[arg(short = 'E', long)]
        extras: Option<String>,

        /// Keep the requirements file
        #[arg(short, long)]
        save: bool,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Upgrade dependencies to their latest versions
    Upgrade {
        /// poetry, pdm or uv (default: detected)
        #[arg(long)]
        tool: Option<String>,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Format and lint, fixing what can be fixed
    Lint {
        #[command(flatten)]
        lint: LintArgs,

        /// Check only, do not change files
        #[arg(short, long)]
        check_only: bool,
    },

    /// Check formatting and lint without changing files
    Check {
        #[command(flatten)]
        lint: LintArgs,
    },

    /// Create a git tag for the current version and push it
    Tag {
        /// Tag message
        #[arg(short, long, default_value = "")]
        message: String,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Build and publish the package
    #[command(alias = "publish")]
    Upload {
        #[command(flatten)]
        dry: DryArg,
    },

    /// Start a fastapi dev server
    Dev {
        /// App file, or a port number
        file_or_port: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Run tests with coverage, or scripts/test.sh if present
    Test {
        /// Ignore scripts/test.sh and scripts/test.py
        #[arg(short, long)]
        ignore_script: bool,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Install the project with its dev dependencies
    Deps {
        #[arg(long, group = "installer")]
        uv: bool,
        #[arg(long, group = "installer")]
        pdm: bool,
        #[arg(long, group = "installer")]
        poetry: bool,
        #[arg(long, group = "installer")]
        pip: bool,

        /// Production dependencies only
        #[arg(long)]
        prod: bool,

        /// uv: remove packages not in the lock file
        #[arg(long)]
        no_inexact: bool,

        /// uv: install into .venv instead of the active environment
        #[arg(long)]
        no_active: bool,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Run a shell command line
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,

        #[command(flatten)]
        dry: DryArg,
    },

    /// Show the fast-dev-cli version
    Version,

    /// Show what fast knows about the current project
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct LintArgs {
    /// Files or directories (default: whole project)
    pub files: Vec<String>,

    /// Run a bandit security scan as well
    #[arg(long)]
    pub bandit: bool,

    /// Do not run mypy
    #[arg(long)]
    pub skip_mypy: bool,

    #[command(flatten)]
    pub dry: DryArg,
}

impl LintArgs {
    fn into_request(self, check_only: bool) -> LintRequest {
        LintRequest {
            paths: self.files,
            check_only,
            bandit: self.bandit,
            skip_mypy: self.skip_mypy,
            dry: self.dry.dry,
        }
    }
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let executor = ShellExecutor;
    let session = Session::from_env(&executor).context("failed to read working directory")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Bump {
            part,
            commit,
            no_emoji,
            dry,
        } => {
            let part = match part {
                Some(part) => BumpPart::parse(&part)?,
                None => prompt_part(&mut out)?,
            };
            let req = BumpRequest {
                part,
                commit,
                emoji: !no_emoji,
                dry: dry.dry,
            };
            session.bump(&req, &mut out)?;
        }
        Commands::Sync {
            filename,
            extras,
            save,
            dry,
        } => {
            let req = SyncRequest {
                filename,
                extras,
                save,
                dry: dry.dry,
            };
            session.sync(&req, &mut out)?;
        }
        Commands::Upgrade { tool, dry } => {
            session.upgrade(&UpgradeRequest { tool, dry: dry.dry }, &mut out)?;
        }
        Commands::Lint { lint, check_only } => {
            session.lint(&lint.into_request(check_only), &mut out)?;
        }
        Commands::Check { lint } => {
            session.lint(&lint.into_request(true), &mut out)?;
        }
        Commands::Tag { message, dry } => {
            session.tag(&TagRequest { message, dry: dry.dry }, &mut out)?;
        }
        Commands::Upload { dry } => session.publish(dry.dry, &mut out)?,
        Commands::Dev {
            file_or_port,
            port,
            host,
            dry,
        } => {
            let req = DevRequest {
                target: file_or_port,
                port,
                host,
                dry: dry.dry,
            };
            session.dev(&req, &mut out)?;
        }
        Commands::Test { ignore_script, dry } => {
            let req = TestRequest {
                ignore_script,
                dry: dry.dry,
            };
            session.test(&req, &mut out)?;
        }
        Commands::Deps {
            uv,
            pdm,
            poetry,
            pip,
            prod,
            no_inexact,
            no_active,
            dry,
        } => {
            let installer = [
                (uv, Installer::Uv),
                (pdm, Installer::Pdm),
                (poetry, Installer::Poetry),
                (pip, Installer::Pip),
            ]
            .into_iter()
            .find_map(|(chosen, installer)| chosen.then_some(installer));
            let req = DepsRequest {
                installer,
                prod,
                inexact: !no_inexact,
                active: !no_active,
                dry: dry.dry,
            };
            session.deps(&req, &mut out)?;
        }
        Commands::Exec { command, dry } => {
            session.exec(&command.join(" "), dry.dry, &mut out)?;
        }
        Commands::Version => {
            writeln!(out, "Fast Dev Cli version: {}", env!("CARGO_PKG_VERSION"))?;
        }
        Commands::Info { json } => {
            let info = session.info()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
            } else {
                print_info(&mut out, &info)?;
            }
        }
    }
    Ok(())
}

/// Ask for the bump part; an empty answer means patch
fn prompt_part(out: &mut dyn Write) -> Result<BumpPart> {
    writeln!(out, "Which one?")?;
    for (i, part) in ["patch", "minor", "major"].iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, part)?;
    }
    write!(out, "> ")?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(BumpPart::Patch);
    }
    Ok(BumpPart::parse(answer)?)
}

fn print_info(out: &mut dyn Write, info: &ProjectInfo) -> Result<()> {
    let missing = || "-".dimmed().to_string();
    let rows = [
        ("root", info.root.display().to_string()),
        (
            "manifest",
            info.manifest
                .as_ref()
                .map_or_else(missing, |p| p.display().to_string()),
        ),
        ("tool", info.tool.to_string()),
        (
            "virtualenv",
            info.virtual_env
                .as_ref()
                .map_or_else(missing, |p| p.display().to_string()),
        ),
        ("version", info.version.clone()),
    ];
    for (key, value) in rows {
        writeln!(out, "{}{}", format!("{:<12}", format!("{}:", key)).bold(), value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dev_with_port() {
        let cli = Cli::try_parse_from(["fast", "dev", "9000", "--dry"]).unwrap();
        match cli.command {
            Commands::Dev {
                file_or_port, dry, ..
            } => {
                assert_eq!(file_or_port.as_deref(), Some("9000"));
                assert!(dry.dry);
            }
            _ => panic!("expected dev"),
        }
    }

    #[test]
    fn test_parse_deps_installer_group() {
        assert!(Cli::try_parse_from(["fast", "deps", "--uv", "--pip"]).is_err());
        assert!(Cli::try_parse_from(["fast", "deps", "--pdm", "--prod"]).is_ok());
    }

    #[test]
    fn test_parse_exec_keeps_words() {
        let cli = Cli::try_parse_from(["fast", "exec", "--dry", "ls", "-la"]).unwrap();
        match cli.command {
            Commands::Exec { command, dry } => {
                assert_eq!(command, ["ls", "-la"]);
                assert!(dry.dry);
            }
            _ => panic!("expected exec"),
        }
    }
}
