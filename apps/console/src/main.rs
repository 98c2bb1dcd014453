use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::Parser;
use command_core::{CommandPipeline, IntakeState, RunOutcome, RunReport};
use futures::StreamExt;
use plant_integration::InMemoryCommandBackend;
use shared::{
    domain::{CommandDescriptor, LogEntry},
    error::{CommandError, ErrorCode},
    protocol::{PipelineEvent, COMMAND_QUERY_PARAM},
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

mod config;

use config::load_settings;

/// Runs one simulated AquaFlow command dispatch in the terminal.
#[derive(Parser, Debug)]
#[command(name = "aquaflow-console")]
struct Args {
    /// Page url (absolute or `/path?query`) carrying the `data` parameter.
    #[arg(long, conflicts_with = "data")]
    url: Option<String>,
    /// Raw command JSON, as it would appear decoded in the `data` parameter.
    #[arg(long)]
    data: Option<String>,
    /// Operator justification; required for high and critical risk commands.
    #[arg(long)]
    override_reason: Option<String>,
    /// Settings file; defaults to `aquaflow.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit events and the final report as JSON lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(args.config.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let descriptor = match intake(&args) {
        IntakeState::Ready(descriptor) => descriptor,
        IntakeState::NoCommandData(err) => {
            let error = CommandError::new(ErrorCode::NoCommandData, err.to_string());
            if !args.json {
                println!("No Command Data");
                println!("  {}", error.message);
                println!("  Open this page from a dashboard action that issues a command.");
            }
            return Err(exit_with(&error, args.json));
        }
    };

    let backend = Arc::new(InMemoryCommandBackend::with_failure_rate(
        settings.failure_rate,
        settings.seed,
    ));
    let mut pipeline = CommandPipeline::new(descriptor, backend, settings.pipeline_options());
    if let Some(reason) = &args.override_reason {
        pipeline.set_override_reason(reason.as_str());
    }

    if !args.json {
        render_review(&pipeline);
    }
    if !pipeline.can_execute() {
        let risk = pipeline.descriptor().risk_level;
        let error = CommandError::new(
            ErrorCode::OverrideRequired,
            format!("override reason required for {risk} risk commands"),
        );
        if !args.json {
            println!("Execute disabled: {}", error.message);
        }
        return Err(exit_with(&error, args.json));
    }

    let events = BroadcastStream::new(pipeline.subscribe());
    let printer = tokio::spawn(render_events(events, args.json));

    let report = tokio::select! {
        report = pipeline.execute() => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("console: run abandoned by operator");
            let error = CommandError::new(
                ErrorCode::Cancelled,
                "run abandoned; no further stages will be dispatched",
            );
            if !args.json {
                println!("Run abandoned; no further stages will be dispatched.");
            }
            return Err(exit_with(&error, args.json));
        }
    };
    let report = match report {
        Ok(report) => report,
        Err(err) => {
            let error = CommandError::new(ErrorCode::Internal, err.to_string());
            return Err(exit_with(&error, args.json));
        }
    };
    if let Err(err) = printer.await {
        warn!("console: event printer stopped: {err}");
    }

    info!(
        success = report.result.success,
        final_stage = %report.final_stage,
        "console: run finished"
    );
    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        render_result(&report);
    }

    match run_error(&report) {
        Some(error) => Err(exit_with(&error, args.json)),
        None => Ok(()),
    }
}

/// Failure summary for a run that did not end in a successful result.
fn run_error(report: &RunReport) -> Option<CommandError> {
    match report.outcome {
        RunOutcome::Halted { check } => Some(CommandError::new(
            ErrorCode::PreflightHalted,
            format!("preflight check `{check}` failed: {}", report.result.message),
        )),
        RunOutcome::Completed if !report.result.success => Some(CommandError::new(
            ErrorCode::ExecutionFailed,
            report.result.message.clone(),
        )),
        RunOutcome::Completed => None,
    }
}

/// Prints `error` as a JSON line in `--json` mode and turns it into the
/// process exit error.
fn exit_with(error: &CommandError, json: bool) -> anyhow::Error {
    if json {
        match serde_json::to_string(error) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!("console: failed to encode error: {err}"),
        }
    }
    anyhow!("{:?}: {}", error.code, error.message)
}

fn intake(args: &Args) -> IntakeState {
    match (&args.url, &args.data) {
        (Some(location), _) => IntakeState::from_location(location),
        (None, Some(json)) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(COMMAND_QUERY_PARAM, json)
                .finish();
            IntakeState::from_query(&query)
        }
        (None, None) => IntakeState::from_query(""),
    }
}

fn render_review(pipeline: &CommandPipeline) {
    let descriptor = pipeline.descriptor();
    let risk = pipeline.risk_display();

    println!("=== Command Review ===");
    println!("Equipment  : {}", equipment_label(descriptor));
    if !descriptor.plant_name.is_empty() {
        println!("Plant      : {}", descriptor.plant_name);
    }
    if !descriptor.parameter_name.is_empty() {
        println!("Parameter  : {}", descriptor.parameter_name);
    }
    println!("Change     : {}", descriptor.change_summary());
    println!("Risk       : {} ({})", risk.label, risk.guidance);
    println!("Source     : {}", descriptor.source);
    if let Some(reasoning) = &descriptor.reasoning {
        println!("Reasoning  : {reasoning}");
    }
    if let Some(root_cause) = &descriptor.root_cause {
        println!("Root cause : {root_cause}");
    }
    println!();
}

fn equipment_label(descriptor: &CommandDescriptor) -> String {
    if descriptor.equipment_id.0.is_empty() {
        descriptor.equipment_name.clone()
    } else {
        format!("{} ({})", descriptor.equipment_name, descriptor.equipment_id)
    }
}

async fn render_events(mut events: BroadcastStream<PipelineEvent>, json: bool) {
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                warn!("console: event stream lagged: {err}");
                continue;
            }
        };

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!("console: failed to encode event: {err}"),
            }
            continue;
        }

        match event {
            PipelineEvent::StageEntered { stage } => println!("── {} ──", stage.label()),
            PipelineEvent::LogAppended { entry } => println!("{}", format_entry(&entry)),
            PipelineEvent::CheckUpdated { .. } | PipelineEvent::Finished { .. } => {}
        }
    }
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {:<7} {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.level.as_str().to_ascii_uppercase(),
        entry.message
    )
}

fn render_result(report: &RunReport) {
    println!();
    match report.outcome {
        RunOutcome::Completed if report.result.success => {
            println!("✓ Command completed: {}", report.result.message);
        }
        RunOutcome::Completed => println!("✗ Command failed: {}", report.result.message),
        RunOutcome::Halted { check } => {
            println!("✗ Halted at preflight ({check}): {}", report.result.message);
        }
    }
    if let Some(command_id) = report.result.command_id {
        println!("  command id: {command_id}");
    }
}
