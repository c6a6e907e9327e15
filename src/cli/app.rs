//! Operator console. Migrations are operator-supervised: every error is
//! printed and the process exits nonzero; nothing retries automatically.

use anyhow::Context;
use clap::{Parser, Subcommand};
use migradb::{JournalRecord, Migrator, MigratorConfig, StepId};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "migradb", version, about = "Schema migration operator console")]
pub struct Cli {
    /// Directory for snapshot, journal, and lock files
    /// (falls back to MIGRADB_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory of step definition files
    /// (falls back to MIGRADB_STEPS_DIR)
    #[arg(long)]
    steps_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every known step and whether it is applied
    Status,
    /// Show the order unapplied steps would run in
    Plan,
    /// Apply unapplied steps, optionally up to a target step
    Apply {
        /// Apply only this step and its dependencies (namespace.name)
        #[arg(long)]
        target: Option<String>,
    },
    /// Revert one applied step (namespace.name)
    Revert { step: String },
    /// Show the apply/revert audit trail
    History,
    /// Show the current shape of a table
    Describe { table: String },
}

fn build_config(cli: &Cli) -> anyhow::Result<MigratorConfig> {
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| env::var("MIGRADB_DATA_DIR").ok().map(PathBuf::from))
        .context("no data directory: pass --data-dir or set MIGRADB_DATA_DIR")?;
    let steps_dir = cli
        .steps_dir
        .clone()
        .or_else(|| env::var("MIGRADB_STEPS_DIR").ok().map(PathBuf::from));

    let mut config = MigratorConfig::new(data_dir);
    if let Some(steps_dir) = steps_dir {
        config = config.steps_dir(steps_dir);
    }
    Ok(config)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let migrator = Migrator::open(config)?;

    match &cli.command {
        Command::Status => {
            for (id, applied) in migrator.status().await {
                println!("{} {}", if applied { "[X]" } else { "[ ]" }, id);
            }
        }
        Command::Plan => {
            let order = migrator.plan().await?;
            if order.is_empty() {
                println!("Nothing to apply.");
            } else {
                for id in order {
                    println!("{}", id);
                }
            }
        }
        Command::Apply { target } => {
            let applied = match target {
                Some(target) => {
                    let id: StepId = target.parse()?;
                    migrator.apply_to(&id).await?
                }
                None => migrator.apply_all().await?,
            };
            if applied.is_empty() {
                println!("Nothing to apply.");
            } else {
                for id in &applied {
                    println!("applied {}", id);
                }
            }
        }
        Command::Revert { step } => {
            let id: StepId = step.parse()?;
            match migrator.revert_step(&id).await? {
                migradb::RevertOutcome::Reverted => println!("reverted {}", id),
                migradb::RevertOutcome::NotApplied => println!("{} is not applied", id),
            }
        }
        Command::History => {
            for record in migrator.history().await? {
                match record {
                    JournalRecord::Applied { step, at } => println!("{}  applied   {}", at, step),
                    JournalRecord::Reverted { step, at } => println!("{}  reverted  {}", at, step),
                }
            }
        }
        Command::Describe { table } => {
            let schema = migrator.describe_table(table).await?;
            for column in schema.columns() {
                let mut flags = Vec::new();
                if !column.nullable {
                    flags.push("NOT NULL");
                }
                if column.unique {
                    flags.push("UNIQUE");
                }
                println!("{} {} {}", column.name, column.data_type, flags.join(" "));
            }
        }
    }
    Ok(())
}
