use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        CommandDescriptor, CommandResult, CommandSource, EquipmentId, LogEntry, PlantId,
        PreflightCheck, RiskLevel, Stage,
    },
    error::PayloadError,
};

/// Name of the query parameter carrying the JSON command payload.
pub const COMMAND_QUERY_PARAM: &str = "data";

/// JSON shape of the `data` query parameter. Everything is optional on the
/// wire; [`CommandPayload::into_descriptor`] enforces the required fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CommandSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
}

impl CommandPayload {
    pub fn into_descriptor(self) -> Result<CommandDescriptor, PayloadError> {
        let equipment_name = self
            .equipment_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(PayloadError::MissingField("equipmentName"))?;
        let target_value = self
            .target_value
            .ok_or(PayloadError::MissingField("targetValue"))?;
        if !target_value.is_finite() {
            return Err(PayloadError::NotFinite {
                field: "targetValue",
            });
        }
        if matches!(self.current_value, Some(v) if !v.is_finite()) {
            return Err(PayloadError::NotFinite {
                field: "currentValue",
            });
        }

        Ok(CommandDescriptor {
            equipment_id: EquipmentId(self.equipment_id.unwrap_or_default()),
            equipment_name,
            plant_id: PlantId(self.plant_id.unwrap_or_default()),
            plant_name: self.plant_name.unwrap_or_default(),
            parameter_name: self.parameter_name.unwrap_or_default(),
            current_value: self.current_value,
            target_value,
            unit: self.unit.unwrap_or_default(),
            risk_level: self.risk_level.unwrap_or(RiskLevel::Medium),
            source: self.source.unwrap_or(CommandSource::Manual),
            reasoning: non_blank(self.reasoning),
            root_cause: non_blank(self.root_cause),
        })
    }
}

impl From<&CommandDescriptor> for CommandPayload {
    fn from(descriptor: &CommandDescriptor) -> Self {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        Self {
            equipment_id: non_empty(&descriptor.equipment_id.0),
            equipment_name: Some(descriptor.equipment_name.clone()),
            plant_id: non_empty(&descriptor.plant_id.0),
            plant_name: non_empty(&descriptor.plant_name),
            parameter_name: non_empty(&descriptor.parameter_name),
            current_value: descriptor.current_value,
            target_value: Some(descriptor.target_value),
            unit: non_empty(&descriptor.unit),
            risk_level: Some(descriptor.risk_level),
            source: Some(descriptor.source),
            reasoning: descriptor.reasoning.clone(),
            root_cause: descriptor.root_cause.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Progress notifications published while a command run advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageEntered { stage: Stage },
    CheckUpdated { check: PreflightCheck },
    LogAppended { entry: LogEntry },
    Finished { stage: Stage, result: CommandResult },
}
