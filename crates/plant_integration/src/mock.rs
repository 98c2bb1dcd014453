use std::{collections::HashMap, sync::Mutex as StdMutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::domain::{CommandDescriptor, CommandId, CommandStatus, ControlCommand};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{CommandBackend, ExecuteOptions, ExecutionOutcome};

/// In-process stand-in for the plant command service. Commands live only as
/// long as the backend value.
pub struct InMemoryCommandBackend {
    commands: Mutex<HashMap<CommandId, ControlCommand>>,
    failure_rate: f64,
    rng: StdMutex<StdRng>,
}

impl InMemoryCommandBackend {
    pub fn new() -> Self {
        Self::with_failure_rate(0.0, None)
    }

    /// `failure_rate` is clamped to `0.0..=1.0` and NaN counts as never
    /// failing; a seed makes the failure rolls reproducible.
    pub fn with_failure_rate(failure_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            commands: Mutex::new(HashMap::new()),
            failure_rate: if failure_rate.is_nan() {
                0.0
            } else {
                failure_rate.clamp(0.0, 1.0)
            },
            rng: StdMutex::new(rng),
        }
    }

    pub async fn command(&self, command_id: CommandId) -> Option<ControlCommand> {
        self.commands.lock().await.get(&command_id).cloned()
    }

    pub async fn command_count(&self) -> usize {
        self.commands.lock().await.len()
    }

    fn roll_failure(&self) -> bool {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.failure_rate),
            Err(poisoned) => poisoned.into_inner().gen_bool(self.failure_rate),
        }
    }
}

impl Default for InMemoryCommandBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandBackend for InMemoryCommandBackend {
    async fn create_command(
        &self,
        descriptor: &CommandDescriptor,
        override_reason: Option<&str>,
        operator: &str,
    ) -> Result<ControlCommand> {
        let command = ControlCommand {
            command_id: CommandId::new(),
            descriptor: descriptor.clone(),
            override_reason: override_reason.map(str::to_string),
            operator: operator.to_string(),
            status: CommandStatus::Pending,
            created_at: Utc::now(),
        };
        info!(
            command_id = %command.command_id,
            equipment = %descriptor.equipment_name,
            risk = %descriptor.risk_level,
            "backend: command created"
        );
        self.commands
            .lock()
            .await
            .insert(command.command_id, command.clone());
        Ok(command)
    }

    async fn execute_command(
        &self,
        command_id: CommandId,
        options: ExecuteOptions,
    ) -> Result<ExecutionOutcome> {
        let failed = self.roll_failure();
        let mut commands = self.commands.lock().await;
        let command = commands
            .get_mut(&command_id)
            .ok_or_else(|| anyhow!("unknown command {command_id}"))?;
        if command.status != CommandStatus::Pending {
            return Err(anyhow!(
                "command {command_id} already executed (status {:?})",
                command.status
            ));
        }

        command.status = CommandStatus::Executing;
        debug!(%command_id, operator = %options.operator, "backend: executing command");

        let descriptor = &command.descriptor;
        let outcome = if failed {
            command.status = CommandStatus::Failed;
            ExecutionOutcome {
                success: false,
                message: format!(
                    "{} did not confirm the new setpoint for {}",
                    descriptor.equipment_name,
                    descriptor.parameter_label()
                ),
            }
        } else {
            command.status = CommandStatus::Completed;
            ExecutionOutcome {
                success: true,
                message: format!(
                    "{} set to {} on {}",
                    descriptor.parameter_label(),
                    descriptor.change_summary(),
                    descriptor.equipment_name
                ),
            }
        };
        info!(%command_id, success = outcome.success, "backend: command finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::{CommandSource, EquipmentId, PlantId, RiskLevel};

    use super::*;

    fn descriptor() -> CommandDescriptor {
        CommandDescriptor {
            equipment_id: EquipmentId("pump-a".into()),
            equipment_name: "Pump A".into(),
            plant_id: PlantId("north".into()),
            plant_name: "North Plant".into(),
            parameter_name: "Discharge Pressure".into(),
            current_value: Some(10.0),
            target_value: 12.0,
            unit: "bar".into(),
            risk_level: RiskLevel::Medium,
            source: CommandSource::Manual,
            reasoning: None,
            root_cause: None,
        }
    }

    #[tokio::test]
    async fn created_command_is_pending_until_executed() {
        let backend = InMemoryCommandBackend::new();
        let command = backend
            .create_command(&descriptor(), Some("scheduled maintenance"), "operator")
            .await
            .expect("create");
        assert_eq!(command.status, CommandStatus::Pending);
        assert_eq!(command.override_reason.as_deref(), Some("scheduled maintenance"));

        let outcome = backend
            .execute_command(command.command_id, ExecuteOptions::default())
            .await
            .expect("execute");
        assert!(outcome.success);
        assert!(outcome.message.contains("10 bar → 12 bar"));

        let stored = backend.command(command.command_id).await.expect("stored");
        assert_eq!(stored.status, CommandStatus::Completed);
    }

    #[tokio::test]
    async fn full_failure_rate_reports_unsuccessful_outcome() {
        let backend = InMemoryCommandBackend::with_failure_rate(1.0, Some(7));
        let command = backend
            .create_command(&descriptor(), None, "operator")
            .await
            .expect("create");
        let outcome = backend
            .execute_command(command.command_id, ExecuteOptions::default())
            .await
            .expect("execute");
        assert!(!outcome.success);
        let stored = backend.command(command.command_id).await.expect("stored");
        assert_eq!(stored.status, CommandStatus::Failed);
    }

    #[tokio::test]
    async fn nan_failure_rate_never_fails() {
        let backend = InMemoryCommandBackend::with_failure_rate(f64::NAN, Some(1));
        let command = backend
            .create_command(&descriptor(), None, "operator")
            .await
            .expect("create");
        let outcome = backend
            .execute_command(command.command_id, ExecuteOptions::default())
            .await
            .expect("execute");
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn unknown_or_repeated_execution_is_an_error() {
        let backend = InMemoryCommandBackend::new();
        backend
            .execute_command(CommandId::new(), ExecuteOptions::default())
            .await
            .expect_err("unknown id");

        let command = backend
            .create_command(&descriptor(), None, "operator")
            .await
            .expect("create");
        backend
            .execute_command(command.command_id, ExecuteOptions::default())
            .await
            .expect("first execution");
        backend
            .execute_command(command.command_id, ExecuteOptions::default())
            .await
            .expect_err("second execution");
        assert_eq!(backend.command_count().await, 1);
    }
}
