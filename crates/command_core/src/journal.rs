use chrono::Utc;
use shared::{
    domain::{CommandResult, LogEntry, LogLevel, PreflightCheck, Stage},
    protocol::PipelineEvent,
};
use tokio::sync::broadcast;

/// Upper bound on buffered events per subscriber.
pub const MAX_EVENT_CAPACITY: usize = 65_536;

/// Append-only, insertion-ordered record of what a run did.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: impl Into<String>, level: LogLevel) -> &LogEntry {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
            level,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// The execution log plus the broadcast side that front ends subscribe to.
/// Publishing never fails a run; events sent with no subscriber are dropped.
pub struct RunJournal {
    log: ExecutionLog,
    events: broadcast::Sender<PipelineEvent>,
}

impl RunJournal {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.clamp(1, MAX_EVENT_CAPACITY));
        Self {
            log: ExecutionLog::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = self.log.append(message, level).clone();
        self.publish(PipelineEvent::LogAppended { entry });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn stage_entered(&self, stage: Stage) {
        self.publish(PipelineEvent::StageEntered { stage });
    }

    pub fn check_updated(&self, check: &PreflightCheck) {
        self.publish(PipelineEvent::CheckUpdated {
            check: check.clone(),
        });
    }

    pub fn finished(&self, stage: Stage, result: &CommandResult) {
        self.publish(PipelineEvent::Finished {
            stage,
            result: result.clone(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        self.log.entries()
    }

    pub fn into_log(self) -> ExecutionLog {
        self.log
    }

    fn publish(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }
}
