// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_plan_path;

/// Command-line arguments for `bakeplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bakeplan",
    version,
    about = "Infer product dependencies from file globs and bake targets in order.",
    long_about = None
)]
pub struct CliArgs {
    /// Plan file (TOML). Repeat to load several; later files win on
    /// conflicting settings.
    ///
    /// Default: `Bakefile.toml` in the current working directory.
    #[arg(long = "plan", value_name = "PATH", global = true)]
    pub plans: Vec<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BAKEPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the product graph.
    Graph {
        /// Restrict `--dot` output to these targets and their prerequisites.
        #[arg(value_name = "PRODUCT")]
        targets: Vec<String>,

        /// Emit Graphviz DOT instead of the plain listing.
        #[arg(long)]
        dot: bool,
    },

    /// Print the order in which the targets would be cooked, without running anything.
    Plan {
        #[arg(value_name = "PRODUCT", required = true)]
        targets: Vec<String>,
    },

    /// Cook the targets and everything they need.
    Build {
        #[arg(value_name = "PRODUCT", required = true)]
        targets: Vec<String>,

        /// Maximum number of products cooked at once.
        #[arg(long, short, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Validate plan files and report dependency cycles.
    Check,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    pub fn plan_paths(&self) -> Vec<PathBuf> {
        if self.plans.is_empty() {
            vec![default_plan_path()]
        } else {
            self.plans.clone()
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_defaults_to_bakefile() {
        let args = CliArgs::try_parse_from(["bakeplan", "check"]).unwrap();
        assert_eq!(args.plan_paths(), vec![PathBuf::from("Bakefile.toml")]);
    }

    #[test]
    fn plan_flag_repeats_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "bakeplan", "build", "app", "--plan", "a.toml", "--plan", "b.toml", "-j", "3",
        ])
        .unwrap();
        assert_eq!(
            args.plan_paths(),
            vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]
        );
        match args.command {
            Command::Build { targets, jobs } => {
                assert_eq!(targets, vec!["app".to_string()]);
                assert_eq!(jobs, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn build_requires_a_target() {
        assert!(CliArgs::try_parse_from(["bakeplan", "build"]).is_err());
    }
}
