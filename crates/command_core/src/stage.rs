use shared::domain::Stage;

use crate::error::PipelineError;

/// Walks [`Stage::ORDER`] strictly forward. The current index never
/// decreases and no stage is skipped.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    current: Stage,
    history: Vec<Stage>,
}

impl StageSequencer {
    pub fn new() -> Self {
        Self {
            current: Stage::Review,
            history: vec![Stage::Review],
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Every stage entered so far, in order, starting with review.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn advance(&mut self) -> Result<Stage, PipelineError> {
        let next = self.current.next().ok_or(PipelineError::AlreadyComplete)?;
        self.current = next;
        self.history.push(next);
        Ok(next)
    }
}

impl Default for StageSequencer {
    fn default() -> Self {
        Self::new()
    }
}
