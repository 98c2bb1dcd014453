use shared::{domain::RiskLevel, error::PayloadError};
use thiserror::Error;

/// Reasons a location cannot be turned into a command descriptor. Every
/// variant ends in the "no command data" state.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("no `data` parameter present")]
    MissingData,
    #[error("invalid command url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("command data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("command data is incomplete: {0}")]
    InvalidPayload(#[from] PayloadError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("an override reason is required before executing a {0} risk command")]
    OverrideReasonRequired(RiskLevel),
    #[error("command run already reached the complete stage")]
    AlreadyComplete,
}
