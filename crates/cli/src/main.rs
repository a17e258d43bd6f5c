//! `trigger-projection`: enqueue an artifact-update request for a template and
//! optionally drain both pipeline queues once.
//!
//! - `trigger-projection --list` prints the available template IDs
//! - `trigger-projection header` enqueues a request for the `header` template
//! - `trigger-projection -p header` enqueues it and processes the queues

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use catalog_events::DrainSummary;
use catalog_infra::{PipelineConfig, Stage};
use catalog_observability::LogFormat;

mod args;
mod bootstrap;
mod templates;

use args::Args;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    catalog_observability::init_with(LogFormat::Pretty);

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;

    if args.list {
        println!("Available template IDs:");
        println!("{}", bootstrap::template_codes(&config, &args.templates)?.join("\n"));
        return Ok(ExitCode::SUCCESS);
    }

    let Some(template_id) = args.template_id.as_deref() else {
        anyhow::bail!("a template ID is required (use --list to see them)");
    };
    let dispatcher = bootstrap::dispatcher(&config, &args.templates, &args.output)?;
    dispatcher.submit(template_id, args.payload.as_str())?;

    if !args.process_queues {
        return Ok(ExitCode::SUCCESS);
    }

    let report = dispatcher.process_queues_with(&mut |stage| match stage {
        Stage::Commands => println!("Processing command queue..."),
        Stage::DomainEvents => println!("Processing domain event queue..."),
    })?;

    let failed = summarize("command", &report.commands) + summarize("domain event", &report.events);
    if failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn summarize(queue: &str, summary: &DrainSummary) -> usize {
    for failure in &summary.failures {
        warn!(queue, message_id = ?failure.message_id, error = %failure.failure, "message failed");
    }
    if !summary.is_clean() {
        eprintln!(
            "{} of {} {queue} message(s) failed; they were removed from the queue",
            summary.failed(),
            summary.attempted
        );
    }
    summary.failed()
}
