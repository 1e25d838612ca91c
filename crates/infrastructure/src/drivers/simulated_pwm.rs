use async_trait::async_trait;
use domain::driver::OutputDriver;
use domain::output::{OutputState, OutputType, SwitchState};
use domain::DomainError;

use super::PwmSignal;

/// In-memory PWM channel
pub struct SimulatedPwm {
    invert: bool,
    signal: PwmSignal,
    setup: bool,
}

impl SimulatedPwm {
    pub fn new(invert: bool) -> Self {
        Self {
            invert,
            signal: PwmSignal::off(invert),
            setup: false,
        }
    }

    /// Duty cycle currently on the wire
    pub fn raw_duty_cycle(&self) -> f64 {
        self.signal.raw
    }
}

#[async_trait]
impl OutputDriver for SimulatedPwm {
    async fn setup(&mut self) -> Result<(), DomainError> {
        self.setup = true;
        tracing::info!(invert = self.invert, "Simulated PWM ready");
        Ok(())
    }

    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
    ) -> Result<(), DomainError> {
        self.signal = PwmSignal::resolve(state, output_type, amount, self.invert)?;
        tracing::debug!(
            duty_cycle = self.signal.duty_cycle,
            raw = self.signal.raw,
            "Duty cycle set to {:.2} %",
            self.signal.raw
        );
        Ok(())
    }

    fn is_on(&self) -> OutputState {
        self.signal.state()
    }

    fn is_setup(&self) -> bool {
        self.setup
    }

    async fn release_locks(&mut self) -> Result<(), DomainError> {
        Ok(())
    }

    fn driver_type(&self) -> &str {
        "simulated_pwm"
    }
}
