use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

id_newtype!(EquipmentId);
id_newtype!(PlantId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// High and critical commands need a written operator justification.
    pub fn requires_reason(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!(
                "unknown risk level '{other}' (expected low, medium, high or critical)"
            )),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Manual,
    AiOptimization,
    VirtualTwin,
    AlarmResponse,
}

impl CommandSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandSource::Manual => "manual",
            CommandSource::AiOptimization => "ai_optimization",
            CommandSource::VirtualTwin => "virtual_twin",
            CommandSource::AlarmResponse => "alarm_response",
        }
    }
}

impl FromStr for CommandSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "manual" => Ok(CommandSource::Manual),
            "ai_optimization" => Ok(CommandSource::AiOptimization),
            "virtual_twin" => Ok(CommandSource::VirtualTwin),
            "alarm_response" => Ok(CommandSource::AlarmResponse),
            other => Err(format!("unknown command source '{other}'")),
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A requested setpoint change, decoded from the page's `data` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    pub plant_id: PlantId,
    pub plant_name: String,
    pub parameter_name: String,
    pub current_value: Option<f64>,
    pub target_value: f64,
    pub unit: String,
    pub risk_level: RiskLevel,
    pub source: CommandSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
}

impl CommandDescriptor {
    pub fn requires_reason(&self) -> bool {
        self.risk_level.requires_reason()
    }

    /// Parameter name, or `setpoint` when the payload left it blank.
    pub fn parameter_label(&self) -> &str {
        if self.parameter_name.is_empty() {
            "setpoint"
        } else {
            &self.parameter_name
        }
    }

    pub fn target_summary(&self) -> String {
        format_value(self.target_value, &self.unit)
    }

    /// Human readable "current → target unit" summary.
    pub fn change_summary(&self) -> String {
        let target = self.target_summary();
        match self.current_value {
            Some(current) => format!("{} → {}", format_value(current, &self.unit), target),
            None => target,
        }
    }
}

fn format_value(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        format!("{value}")
    } else {
        format!("{value} {unit}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Review,
    Preflight,
    Authorization,
    Transmission,
    Gateway,
    Plc,
    Equipment,
    Verification,
    Complete,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::Review,
        Stage::Preflight,
        Stage::Authorization,
        Stage::Transmission,
        Stage::Gateway,
        Stage::Plc,
        Stage::Equipment,
        Stage::Verification,
        Stage::Complete,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Stage::ORDER.get(self.index() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Review => "review",
            Stage::Preflight => "preflight",
            Stage::Authorization => "authorization",
            Stage::Transmission => "transmission",
            Stage::Gateway => "gateway",
            Stage::Plc => "plc",
            Stage::Equipment => "equipment",
            Stage::Verification => "verification",
            Stage::Complete => "complete",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Review => "Review",
            Stage::Preflight => "Preflight Checks",
            Stage::Authorization => "Authorization",
            Stage::Transmission => "Transmission",
            Stage::Gateway => "Gateway",
            Stage::Plc => "PLC",
            Stage::Equipment => "Equipment",
            Stage::Verification => "Verification",
            Stage::Complete => "Complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    Gateway,
    Plc,
    Interlock,
    Auth,
    Range,
    RateLimit,
}

impl CheckId {
    /// A failure of a critical check stops the run before authorization.
    pub fn is_critical(self) -> bool {
        matches!(self, CheckId::Interlock | CheckId::Plc)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckId::Gateway => "gateway",
            CheckId::Plc => "plc",
            CheckId::Interlock => "interlock",
            CheckId::Auth => "auth",
            CheckId::Range => "range",
            CheckId::RateLimit => "rate_limit",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Checking,
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightCheck {
    pub id: CheckId,
    pub label: String,
    pub status: CheckStatus,
}

impl PreflightCheck {
    pub fn pending(id: CheckId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            status: CheckStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

/// A command as recorded by the command backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub command_id: CommandId,
    pub descriptor: CommandDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    pub operator: String,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
    pub completed_at: DateTime<Utc>,
}

impl CommandResult {
    pub fn succeeded(command_id: CommandId, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            command_id: Some(command_id),
            completed_at: Utc::now(),
        }
    }

    pub fn failed(command_id: Option<CommandId>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            command_id,
            completed_at: Utc::now(),
        }
    }
}
