//! Command execution pipeline: intake of a command descriptor, the ordered
//! stage sequencer, preflight checks, the execution log and the final result.

pub mod error;
pub mod gate;
pub mod intake;
pub mod journal;
pub mod pipeline;
pub mod preflight;
pub mod reporter;
pub mod stage;
pub mod timing;

pub use error::{IntakeError, PipelineError};
pub use gate::can_execute;
pub use intake::{command_from_location, command_from_query, command_url, IntakeState};
pub use journal::{ExecutionLog, RunJournal};
pub use pipeline::{CommandPipeline, PipelineOptions, RunOutcome, RunReport};
pub use preflight::{default_checks, PreflightReport, PreflightRunner};
pub use reporter::ResultReporter;
pub use stage::StageSequencer;
pub use timing::{DelayRange, PipelineTimings};
