//! Seams between the command pipeline and the plant-side collaborators:
//! command creation/execution and preflight readiness probes.

use async_trait::async_trait;
use serde::Serialize;
use shared::domain::{CheckId, CommandDescriptor, CommandId, ControlCommand, RiskLevel};

mod mock;

pub use mock::InMemoryCommandBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskDisplay {
    pub level: RiskLevel,
    pub label: &'static str,
    pub guidance: &'static str,
    pub requires_reason: bool,
}

pub fn risk_display(level: RiskLevel) -> RiskDisplay {
    let (label, guidance) = match level {
        RiskLevel::Low => ("Low Risk", "Routine adjustment within normal operating band."),
        RiskLevel::Medium => (
            "Medium Risk",
            "Monitor the affected process for a few minutes after execution.",
        ),
        RiskLevel::High => (
            "High Risk",
            "May affect downstream treatment; operator justification required.",
        ),
        RiskLevel::Critical => (
            "Critical Risk",
            "Safety-relevant change; operator justification required and logged.",
        ),
    };
    RiskDisplay {
        level,
        label,
        guidance,
        requires_reason: level.requires_reason(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub operator: String,
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
}

#[async_trait]
pub trait CommandBackend: Send + Sync {
    async fn create_command(
        &self,
        descriptor: &CommandDescriptor,
        override_reason: Option<&str>,
        operator: &str,
    ) -> anyhow::Result<ControlCommand>;

    async fn execute_command(
        &self,
        command_id: CommandId,
        options: ExecuteOptions,
    ) -> anyhow::Result<ExecutionOutcome>;

    fn risk_display(&self, level: RiskLevel) -> RiskDisplay {
        risk_display(level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckVerdict {
    Passed,
    Failed(String),
}

#[async_trait]
pub trait CheckProbe: Send + Sync {
    async fn probe(&self, check: CheckId, descriptor: &CommandDescriptor) -> CheckVerdict;
}

/// Probe used when no plant connectivity exists: every check passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedProbe;

#[async_trait]
impl CheckProbe for SimulatedProbe {
    async fn probe(&self, _check: CheckId, _descriptor: &CommandDescriptor) -> CheckVerdict {
        CheckVerdict::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_high_and_critical_require_reason() {
        assert!(!risk_display(RiskLevel::Low).requires_reason);
        assert!(!risk_display(RiskLevel::Medium).requires_reason);
        assert!(risk_display(RiskLevel::High).requires_reason);
        assert!(risk_display(RiskLevel::Critical).requires_reason);
    }

    #[test]
    fn risk_display_serializes_level() {
        let value = serde_json::to_value(risk_display(RiskLevel::Critical)).expect("json");
        assert_eq!(value["level"], "critical");
        assert_eq!(value["label"], "Critical Risk");
    }
}
