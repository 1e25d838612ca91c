mod command;
mod entity;
mod output_id;
mod runtime_state;
mod state;

pub use command::{Command, ManipulateOutcome, ManipulateRequest, ManipulateStatus, OutputType, SwitchState};
pub use entity::{Capability, Output, ShutdownState, StartupState};
pub use output_id::OutputId;
pub use runtime_state::{ElapsedOn, OutputRuntimeState, RunMode};
pub use state::{DutyCycleReading, OutputState};
