//! Application layer - Use cases and business workflows

pub mod messaging;
pub mod output;
pub mod recorder;
pub mod trigger;

pub use messaging::command_listener::{CommandListener, CommandReply, OutputCommand};
pub use output::{OutputManager, OutputRuntime};
pub use recorder::{DurationRecorder, RecorderWorkers};
pub use trigger::{LoggingActionDispatcher, TriggerEvaluator};
