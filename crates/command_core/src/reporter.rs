use plant_integration::{CommandBackend, ExecuteOptions};
use shared::domain::{CommandDescriptor, CommandResult};
use tracing::{error, info};

use crate::journal::RunJournal;

/// Produces the terminal [`CommandResult`]. Consumed by [`ResultReporter::report`]
/// so a run can only report once.
pub struct ResultReporter<'a> {
    backend: &'a dyn CommandBackend,
    operator: &'a str,
}

impl<'a> ResultReporter<'a> {
    pub fn new(backend: &'a dyn CommandBackend, operator: &'a str) -> Self {
        Self { backend, operator }
    }

    pub async fn report(
        self,
        descriptor: &CommandDescriptor,
        override_reason: Option<&str>,
        journal: &mut RunJournal,
    ) -> CommandResult {
        let command = match self
            .backend
            .create_command(descriptor, override_reason, self.operator)
            .await
        {
            Ok(command) => command,
            Err(err) => {
                error!(equipment = %descriptor.equipment_name, "reporter: create_command failed: {err}");
                let result = CommandResult::failed(None, format!("Command could not be created: {err}"));
                journal.error(result.message.clone());
                return result;
            }
        };

        let options = ExecuteOptions {
            operator: self.operator.to_string(),
            override_reason: override_reason.map(str::to_string),
        };
        let result = match self
            .backend
            .execute_command(command.command_id, options)
            .await
        {
            Ok(outcome) if outcome.success => {
                CommandResult::succeeded(command.command_id, outcome.message)
            }
            Ok(outcome) => CommandResult::failed(Some(command.command_id), outcome.message),
            Err(err) => {
                error!(command_id = %command.command_id, "reporter: execute_command failed: {err}");
                CommandResult::failed(
                    Some(command.command_id),
                    format!("Command execution failed: {err}"),
                )
            }
        };

        info!(
            command_id = %command.command_id,
            success = result.success,
            "reporter: command result ready"
        );
        if result.success {
            journal.success(format!("Command executed successfully: {}", result.message));
        } else {
            journal.error(format!("Command failed: {}", result.message));
        }
        result
    }
}
