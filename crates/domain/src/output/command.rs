use super::{Capability, Output};
use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized on/off request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    /// Accepts `"on"`, `1`, `true` and `"off"`, `0`, `false`.
    pub fn from_token(token: &Value) -> Result<Self> {
        let state = match token {
            Value::String(s) if s == "on" => Some(Self::On),
            Value::String(s) if s == "off" => Some(Self::Off),
            Value::Bool(true) => Some(Self::On),
            Value::Bool(false) => Some(Self::Off),
            Value::Number(n) => match n.as_f64() {
                Some(v) if v == 1.0 => Some(Self::On),
                Some(v) if v == 0.0 => Some(Self::Off),
                _ => None,
            },
            _ => None,
        };

        state.ok_or_else(|| {
            DomainError::InvalidState(format!(
                "state {token} not \"on\", 1, true, \"off\", 0, or false"
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Kind of manipulation requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// On/off, optionally for a number of seconds
    Sec,
    /// Duty cycle
    Pwm,
    /// Volume
    Vol,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sec => "sec",
            Self::Pwm => "pwm",
            Self::Vol => "vol",
        }
    }

    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Sec => Capability::OnOff,
            Self::Pwm => Capability::Pwm,
            Self::Vol => Capability::Volume,
        }
    }
}

fn default_trigger_conditionals() -> bool {
    true
}

/// A request to change the run state of an output.
///
/// `state` is kept as the raw token so that malformed requests can be
/// rejected with a message instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulateRequest {
    pub state: Value,
    #[serde(default)]
    pub output_type: Option<OutputType>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub min_off: f64,
    #[serde(default = "default_trigger_conditionals")]
    pub trigger_conditionals: bool,
}

impl ManipulateRequest {
    pub fn new(state: impl Into<Value>) -> Self {
        Self {
            state: state.into(),
            output_type: None,
            amount: None,
            min_off: 0.0,
            trigger_conditionals: true,
        }
    }

    pub fn on() -> Self {
        Self::new("on")
    }

    pub fn off() -> Self {
        Self::new("off")
    }

    pub fn output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn min_off(mut self, min_off: f64) -> Self {
        self.min_off = min_off;
        self
    }

    pub fn without_triggers(mut self) -> Self {
        self.trigger_conditionals = false;
        self
    }

    /// Requested amount, absent meaning zero
    pub fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// A request resolved against the output's capabilities
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Volume { amount: f64 },
    DutyCycle { duty_cycle: f64 },
    /// On for `seconds`; the sign is kept for reverse-running actuators
    Timed { seconds: f64 },
    Indefinite,
    Off { output_type: OutputType },
}

impl Command {
    /// Returns `None` when the output cannot honor the request.
    pub fn resolve(
        state: SwitchState,
        output_type: Option<OutputType>,
        amount: f64,
        output: &Output,
    ) -> Option<Self> {
        match (state, output_type) {
            (SwitchState::Off, output_type) => Some(Self::Off {
                output_type: output_type.unwrap_or(OutputType::Sec),
            }),
            (SwitchState::On, Some(OutputType::Vol)) if output.supports(Capability::Volume) => {
                Some(Self::Volume { amount })
            }
            (SwitchState::On, Some(OutputType::Pwm)) if output.supports(Capability::Pwm) => {
                Some(Self::DutyCycle { duty_cycle: amount })
            }
            (SwitchState::On, None | Some(OutputType::Sec))
                if output.supports(Capability::OnOff) =>
            {
                if amount != 0.0 {
                    Some(Self::Timed { seconds: amount })
                } else {
                    Some(Self::Indefinite)
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManipulateStatus {
    Accepted,
    Rejected,
}

/// Result of a manipulation: accepted (code 0) or rejected without side effects (code 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulateOutcome {
    pub status: ManipulateStatus,
    pub message: String,
}

impl ManipulateOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            status: ManipulateStatus::Accepted,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: ManipulateStatus::Rejected,
            message: message.into(),
        }
    }

    pub fn code(&self) -> u8 {
        match self.status {
            ManipulateStatus::Accepted => 0,
            ManipulateStatus::Rejected => 1,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ManipulateStatus::Accepted
    }
}
