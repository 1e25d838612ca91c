mod lock_file;
mod pwm;
mod shell_pwm;
mod simulated_dispenser;
mod simulated_pwm;
mod simulated_relay;

pub use lock_file::LockFile;
pub use pwm::PwmSignal;
pub use shell_pwm::ShellPwm;
pub use simulated_dispenser::SimulatedDispenser;
pub use simulated_pwm::SimulatedPwm;
pub use simulated_relay::SimulatedRelay;

use domain::DomainError;
use domain::driver::OutputDriver;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_lock_timeout_ms() -> u64 {
    60_000
}

/// Driver selection and settings of one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverConfig {
    SimulatedRelay {
        #[serde(default)]
        lock_file: Option<String>,
        #[serde(default = "default_lock_timeout_ms")]
        lock_timeout_ms: u64,
    },
    SimulatedPwm {
        #[serde(default)]
        invert: bool,
    },
    ShellPwm {
        command: String,
        #[serde(default)]
        invert: bool,
    },
    SimulatedDispenser,
}

impl DriverConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimulatedRelay { .. } => "simulated_relay",
            Self::SimulatedPwm { .. } => "simulated_pwm",
            Self::ShellPwm { .. } => "shell_pwm",
            Self::SimulatedDispenser => "simulated_dispenser",
        }
    }
}

/// Factory for creating output drivers
pub struct DriverFactory;

impl DriverFactory {
    pub fn create_driver(config: &DriverConfig) -> Box<dyn OutputDriver> {
        match config {
            DriverConfig::SimulatedRelay {
                lock_file,
                lock_timeout_ms,
            } => Box::new(SimulatedRelay::new(
                lock_file.clone(),
                Duration::from_millis(*lock_timeout_ms),
            )),
            DriverConfig::SimulatedPwm { invert } => Box::new(SimulatedPwm::new(*invert)),
            DriverConfig::ShellPwm { command, invert } => {
                Box::new(ShellPwm::new(command.clone(), *invert))
            }
            DriverConfig::SimulatedDispenser => Box::new(SimulatedDispenser::new()),
        }
    }

    /// Create a driver from an untyped JSON configuration
    pub fn create_from_value(config: serde_json::Value) -> Result<Box<dyn OutputDriver>, DomainError> {
        let config: DriverConfig = serde_json::from_value(config).map_err(|e| {
            DomainError::InvalidConfiguration(format!("Invalid driver config: {}", e))
        })?;
        Ok(Self::create_driver(&config))
    }
}
