use shared::{
    domain::CommandDescriptor,
    protocol::{CommandPayload, COMMAND_QUERY_PARAM},
};
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use crate::error::IntakeError;

const LOCAL_BASE: &str = "http://localhost/";

/// Result of reading the command descriptor on page entry.
#[derive(Debug)]
pub enum IntakeState {
    Ready(CommandDescriptor),
    NoCommandData(IntakeError),
}

impl IntakeState {
    pub fn from_location(location: &str) -> Self {
        Self::from_result(command_from_location(location))
    }

    pub fn from_query(query: &str) -> Self {
        Self::from_result(command_from_query(query))
    }

    fn from_result(result: Result<CommandDescriptor, IntakeError>) -> Self {
        match result {
            Ok(descriptor) => {
                debug!(
                    equipment = %descriptor.equipment_name,
                    risk = %descriptor.risk_level,
                    "intake: command descriptor decoded"
                );
                IntakeState::Ready(descriptor)
            }
            Err(error) => {
                warn!(%error, "intake: no command data");
                IntakeState::NoCommandData(error)
            }
        }
    }

    pub fn descriptor(&self) -> Option<&CommandDescriptor> {
        match self {
            IntakeState::Ready(descriptor) => Some(descriptor),
            IntakeState::NoCommandData(_) => None,
        }
    }
}

/// Decodes the descriptor from an absolute url or a path relative to the
/// dashboard root, e.g. `/command-execution?data=%7B...%7D`.
pub fn command_from_location(location: &str) -> Result<CommandDescriptor, IntakeError> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(LOCAL_BASE)?.join(location)?,
        Err(err) => return Err(err.into()),
    };
    command_from_query(url.query().unwrap_or_default())
}

/// Decodes the descriptor from a raw query string, with or without the
/// leading `?`.
pub fn command_from_query(query: &str) -> Result<CommandDescriptor, IntakeError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let raw = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == COMMAND_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
        .ok_or(IntakeError::MissingData)?;

    let payload: CommandPayload = serde_json::from_str(&raw)?;
    Ok(payload.into_descriptor()?)
}

/// Builds the url a dashboard page would navigate to for `descriptor`.
pub fn command_url(base: &str, descriptor: &CommandDescriptor) -> Result<Url, IntakeError> {
    let mut url = Url::parse(base)?;
    let payload = serde_json::to_string(&CommandPayload::from(descriptor))?;
    url.query_pairs_mut()
        .clear()
        .append_pair(COMMAND_QUERY_PARAM, &payload);
    Ok(url)
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
