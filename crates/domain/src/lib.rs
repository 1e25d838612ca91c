//! Domain layer - Pure business logic with no external dependencies
//!
//! This crate contains:
//! - Entities (Output, TriggerRule)
//! - Value Objects (OutputId, Capability, OutputType, SwitchState)
//! - Runtime timing state of an output (duration mode, indefinite mode, interlock)
//! - Port interfaces (drivers, rule store, measurement store, action dispatch)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Time is always passed in or read through a `Clock`
//! - Testable in isolation

pub mod clock;
pub mod driver;
pub mod error;
pub mod measurement;
pub mod output;
pub mod trigger;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use measurement::{Measurement, MeasurementSample, MeasurementStore};
pub use output::{
    Capability, ManipulateOutcome, ManipulateRequest, Output, OutputId, OutputRuntimeState,
    OutputState, OutputType, RunMode, SwitchState,
};
pub use trigger::{TriggerClass, TriggerCondition, TriggerRule};
