//! `stormig`: copy file attachments of stored records between storage engines.

mod cli;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use stormig_core::{LabelReport, MigrationConfig, MigrationJob, MigrationReport};

/// Log to stderr; `RUST_LOG` overrides the level chosen on the command line.
fn init_logging(level: &str) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(&directives),
        _ => EnvFilter::try_new(format!("{level},aws_config=warn,aws_smithy_runtime=warn")),
    }
    .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Runs the migration `cli` describes, writing each label's skip message
/// and dry-run notices to `out` as soon as that label is done.
async fn execute(cli: &Cli, out: &mut impl Write) -> Result<MigrationReport> {
    let config = MigrationConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let job = MigrationJob::from_config(&config, cli.options())
        .await
        .context("preparing storage migration")?;

    let mut written: io::Result<()> = Ok(());
    let report = job
        .run_reporting(&cli.labels, |label| {
            if cli.json || written.is_err() {
                return;
            }
            written = write_label(out, label);
        })
        .await;
    written.context("writing report")?;

    if cli.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }
    Ok(report)
}

fn write_label(out: &mut impl Write, label: &LabelReport) -> io::Result<()> {
    if let Some(message) = label.message() {
        writeln!(out, "{message}")?;
    }
    for notice in &label.notices {
        writeln!(out, "{notice}")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level())?;

    let report = execute(&cli, &mut io::stdout().lock()).await?;

    let totals = report.totals();
    info!(
        records = totals.records,
        copied = totals.copied,
        planned = totals.planned,
        missing = totals.missing_source,
        existing = totals.already_present,
        failed = totals.failed,
        "storage migration finished"
    );
    Ok(())
}
