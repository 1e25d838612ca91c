use serde::{Deserialize, Serialize};

/// Live state as reported by a driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum OutputState {
    Off,
    On,
    /// Duty cycle in percent
    DutyCycle(f64),
}

/// Duty-cycle view of an output, as compared by PWM trigger rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DutyCycleReading {
    Off,
    Percent(f64),
}

impl OutputState {
    /// True when the output is energized. A zero duty cycle counts as off.
    pub fn is_on(&self) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::DutyCycle(duty) => *duty != 0.0,
        }
    }

    /// A plain "on" reads as full duty.
    pub fn duty_cycle(&self) -> DutyCycleReading {
        match self {
            Self::Off => DutyCycleReading::Off,
            Self::On => DutyCycleReading::Percent(100.0),
            Self::DutyCycle(duty) if *duty == 0.0 => DutyCycleReading::Off,
            Self::DutyCycle(duty) => DutyCycleReading::Percent(*duty),
        }
    }
}

impl std::fmt::Display for DutyCycleReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Percent(duty) => write!(f, "{duty}"),
        }
    }
}
