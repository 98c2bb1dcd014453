use std::sync::Arc;

use plant_integration::{CheckProbe, CommandBackend, RiskDisplay, SimulatedProbe};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use shared::{
    domain::{CheckId, CommandDescriptor, CommandResult, LogEntry, PreflightCheck, Stage},
    protocol::PipelineEvent,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    error::PipelineError,
    gate::{can_execute, normalized_reason},
    journal::RunJournal,
    preflight::{default_checks, PreflightRunner},
    reporter::ResultReporter,
    stage::StageSequencer,
    timing::PipelineTimings,
};

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub timings: PipelineTimings,
    pub operator: String,
    pub event_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timings: PipelineTimings::default(),
            operator: "operator".into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Halted { check: CheckId },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub descriptor: CommandDescriptor,
    pub outcome: RunOutcome,
    pub final_stage: Stage,
    pub stages_visited: Vec<Stage>,
    pub checks: Vec<PreflightCheck>,
    pub log: Vec<LogEntry>,
    pub result: CommandResult,
}

/// One command run, from operator review to the terminal result.
///
/// The value is in the review stage until [`CommandPipeline::execute`]
/// consumes it; [`CommandPipeline::cancel`] hands the descriptor back without
/// running anything. Dropping the `execute` future abandons the run.
pub struct CommandPipeline {
    descriptor: CommandDescriptor,
    backend: Arc<dyn CommandBackend>,
    probe: Arc<dyn CheckProbe>,
    options: PipelineOptions,
    override_reason: String,
    journal: RunJournal,
}

impl CommandPipeline {
    pub fn new(
        descriptor: CommandDescriptor,
        backend: Arc<dyn CommandBackend>,
        options: PipelineOptions,
    ) -> Self {
        let journal = RunJournal::new(options.event_capacity);
        Self {
            descriptor,
            backend,
            probe: Arc::new(SimulatedProbe),
            options,
            override_reason: String::new(),
            journal,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn CheckProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn risk_display(&self) -> RiskDisplay {
        self.backend.risk_display(self.descriptor.risk_level)
    }

    pub fn requires_reason(&self) -> bool {
        self.descriptor.requires_reason()
    }

    pub fn set_override_reason(&mut self, reason: impl Into<String>) {
        self.override_reason = reason.into();
    }

    pub fn can_execute(&self) -> bool {
        can_execute(&self.descriptor, &self.override_reason)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.journal.subscribe()
    }

    pub fn cancel(self) -> CommandDescriptor {
        info!(equipment = %self.descriptor.equipment_name, "pipeline: cancelled during review");
        self.descriptor
    }

    pub async fn execute(self) -> Result<RunReport, PipelineError> {
        if !self.can_execute() {
            warn!(
                equipment = %self.descriptor.equipment_name,
                risk = %self.descriptor.risk_level,
                "pipeline: execute refused, override reason missing"
            );
            return Err(PipelineError::OverrideReasonRequired(
                self.descriptor.risk_level,
            ));
        }

        let Self {
            descriptor,
            backend,
            probe,
            options,
            override_reason,
            mut journal,
        } = self;
        let override_reason = normalized_reason(&override_reason);
        let timings = &options.timings;
        let mut rng = match timings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sequencer = StageSequencer::new();

        info!(
            equipment = %descriptor.equipment_name,
            risk = %descriptor.risk_level,
            source = %descriptor.source,
            "pipeline: execution started"
        );
        journal.info(format!(
            "Command approved for {}: {} {}",
            descriptor.equipment_name,
            descriptor.parameter_label(),
            descriptor.change_summary()
        ));
        if let Some(reason) = override_reason {
            journal.warning(format!("Operator override reason recorded: {reason}"));
        }

        let stage = enter_next(&mut sequencer, &journal)?;
        journal.info("Running preflight checks...");
        let preflight = PreflightRunner::new(default_checks(), timings.preflight_check, &mut rng)
            .run(&descriptor, probe.as_ref(), &mut journal)
            .await;

        if let Some(check) = preflight.critical_failure {
            warn!(check = %check, "pipeline: halted before authorization");
            journal.error("Critical preflight check failed; command not dispatched");
            let result = CommandResult::failed(
                None,
                format!("Preflight check `{check}` failed; command halted before authorization"),
            );
            journal.finished(stage, &result);
            return Ok(RunReport {
                descriptor,
                outcome: RunOutcome::Halted { check },
                final_stage: stage,
                stages_visited: sequencer.history().to_vec(),
                checks: preflight.checks,
                log: journal.into_log().into_entries(),
                result,
            });
        }
        journal.success("All preflight checks passed");

        loop {
            let stage = enter_next(&mut sequencer, &journal)?;
            if stage.is_terminal() {
                break;
            }
            journal.info(stage_started_message(stage, &descriptor, &options.operator));
            tokio::time::sleep(timings.stage_delay(stage)).await;
            journal.success(stage_finished_message(stage, &descriptor, &options.operator));
        }

        let result = ResultReporter::new(backend.as_ref(), &options.operator)
            .report(&descriptor, override_reason, &mut journal)
            .await;
        journal.finished(sequencer.current(), &result);

        Ok(RunReport {
            descriptor,
            outcome: RunOutcome::Completed,
            final_stage: sequencer.current(),
            stages_visited: sequencer.history().to_vec(),
            checks: preflight.checks,
            log: journal.into_log().into_entries(),
            result,
        })
    }
}

fn enter_next(sequencer: &mut StageSequencer, journal: &RunJournal) -> Result<Stage, PipelineError> {
    let stage = sequencer.advance()?;
    info!(stage = %stage, "pipeline: stage entered");
    journal.stage_entered(stage);
    Ok(stage)
}

fn gateway_label(descriptor: &CommandDescriptor) -> String {
    if descriptor.plant_name.is_empty() {
        "plant gateway".to_string()
    } else {
        format!("{} gateway", descriptor.plant_name)
    }
}

fn stage_started_message(stage: Stage, descriptor: &CommandDescriptor, operator: &str) -> String {
    match stage {
        Stage::Authorization => format!(
            "Verifying authorization of {operator} for {} risk command",
            descriptor.risk_level
        ),
        Stage::Transmission => "Encrypting and transmitting command packet".to_string(),
        Stage::Gateway => format!("Awaiting acknowledgement from {}", gateway_label(descriptor)),
        Stage::Plc => format!("Writing {} to PLC", descriptor.parameter_label()),
        Stage::Equipment => format!("Waiting for {} to respond", descriptor.equipment_name),
        Stage::Verification => "Verifying readback against target".to_string(),
        Stage::Review | Stage::Preflight | Stage::Complete => stage.label().to_string(),
    }
}

fn stage_finished_message(stage: Stage, descriptor: &CommandDescriptor, operator: &str) -> String {
    match stage {
        Stage::Authorization => format!("Authorization granted to {operator}"),
        Stage::Transmission => "Command packet transmitted".to_string(),
        Stage::Gateway => format!("Command acknowledged by {}", gateway_label(descriptor)),
        Stage::Plc => format!("PLC accepted setpoint {}", descriptor.target_summary()),
        Stage::Equipment => format!(
            "{} responding, ramping to {}",
            descriptor.equipment_name,
            descriptor.target_summary()
        ),
        Stage::Verification => "Readback within tolerance".to_string(),
        Stage::Review | Stage::Preflight | Stage::Complete => stage.label().to_string(),
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
