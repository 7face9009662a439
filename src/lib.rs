// src/lib.rs

pub mod bakery;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod glob;
pub mod logging;
pub mod plan;
pub mod product;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::bakery::{Bakery, CheckReport};
use crate::cli::{CliArgs, Command};
use crate::exec::BakeReport;
use crate::product::BoundName;

/// High-level entry point used by `main.rs`.
///
/// Loads every plan file into a [`Bakery`], then runs the subcommand:
/// - `graph` prints nodes and edges (or DOT)
/// - `plan` prints the cook order without running anything
/// - `build` cooks the targets and fails if any product failed
/// - `check` fails if the graph has a cycle
pub async fn run(args: CliArgs) -> Result<()> {
    let mut bakery = Bakery::new(args.plan_paths());
    let updates = bakery.load_plans()?;
    debug!(?updates, "plan files applied");

    match args.command {
        Command::Graph { targets, dot } => {
            let targets = parse_targets(&targets)?;
            print!("{}", bakery.graph_text(&targets, dot));
        }
        Command::Plan { targets } => {
            let targets = parse_targets(&targets)?;
            for name in bakery.plan(&targets)? {
                println!("{name}");
            }
        }
        Command::Build { targets, jobs } => {
            let targets = parse_targets(&targets)?;
            if let Some(jobs) = jobs {
                if jobs == 0 {
                    bail!("--jobs must be at least 1");
                }
                bakery.settings_mut().jobs = jobs;
            }
            let report = bakery.build(&targets).await?;
            print_report(&report);
            if !report.all_succeeded {
                bail!(
                    "build failed: {} failed, {} skipped",
                    report.failed.len(),
                    report.skipped.len()
                );
            }
        }
        Command::Check => {
            let report = bakery.check();
            print_check(&report);
            if !report.is_acyclic() {
                bail!("{} dependency cycle(s) found", report.cycles.len());
            }
            info!("plan is acyclic");
        }
    }
    Ok(())
}

fn parse_targets(raw: &[String]) -> Result<Vec<BoundName>> {
    raw.iter()
        .map(|s| BoundName::parse(s).map_err(anyhow::Error::from))
        .collect()
}

fn print_report(report: &BakeReport) {
    for name in &report.succeeded {
        println!("ok      {name}");
    }
    for name in &report.failed {
        println!("FAILED  {name}");
    }
    for name in &report.skipped {
        println!("skipped {name}");
    }
}

fn print_check(report: &CheckReport) {
    for cycle in &report.cycles {
        let names: Vec<&str> = cycle.iter().map(|n| n.as_str()).collect();
        println!("cycle: [{}]", names.join(", "));
    }
    for (template, params) in &report.templates {
        println!("template {template} needs [{}]", params.join(", "));
    }
}
