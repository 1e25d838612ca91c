use async_trait::async_trait;

use crate::error::DomainError;
use crate::output::{OutputState, OutputType, SwitchState};

/// Physical switching capability that infrastructure drivers must provide.
///
/// One driver instance belongs to exactly one output runtime.
#[async_trait]
pub trait OutputDriver: Send + Sync {
    /// Prepare the hardware (acquire locks, open buses). Must leave
    /// `is_setup()` true on success.
    async fn setup(&mut self) -> Result<(), DomainError>;

    /// Perform the physical switch. `amount` is seconds, duty cycle or volume
    /// depending on `output_type`.
    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
    ) -> Result<(), DomainError>;

    /// Live state of the output
    fn is_on(&self) -> OutputState;

    /// Whether the driver is ready to accept commands
    fn is_setup(&self) -> bool;

    /// Release any hardware locks held by this driver
    async fn release_locks(&mut self) -> Result<(), DomainError>;

    /// Driver type identifier
    fn driver_type(&self) -> &str;
}
