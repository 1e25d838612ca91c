use domain::output::{OutputState, OutputType, SwitchState};
use domain::DomainError;

/// Duty cycle of a PWM channel: what was asked for and what goes on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwmSignal {
    /// Requested duty cycle in percent
    pub duty_cycle: f64,
    /// Duty cycle actually written, after inversion
    pub raw: f64,
}

impl PwmSignal {
    pub fn off(invert: bool) -> Self {
        Self {
            duty_cycle: 0.0,
            raw: if invert { 100.0 } else { 0.0 },
        }
    }

    /// Resolve a switch request. Plain "on" drives the channel at full duty.
    pub fn resolve(
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
        invert: bool,
    ) -> Result<Self, DomainError> {
        let duty_cycle = match (state, output_type) {
            (SwitchState::Off, _) => return Ok(Self::off(invert)),
            (SwitchState::On, OutputType::Pwm) => amount.unwrap_or(0.0),
            (SwitchState::On, OutputType::Sec) => 100.0,
            (SwitchState::On, OutputType::Vol) => {
                return Err(DomainError::Driver(
                    "PWM output cannot dispense a volume".to_string(),
                ));
            }
        };

        if !(0.0..=100.0).contains(&duty_cycle) {
            return Err(DomainError::Driver(format!(
                "Duty cycle {} outside 0-100 %",
                duty_cycle
            )));
        }

        let raw = if invert {
            100.0 - duty_cycle.abs()
        } else {
            duty_cycle
        };
        Ok(Self { duty_cycle, raw })
    }

    pub fn state(&self) -> OutputState {
        if self.duty_cycle == 0.0 {
            OutputState::Off
        } else {
            OutputState::DutyCycle(self.duty_cycle)
        }
    }
}
