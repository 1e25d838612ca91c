use super::{OutputId, OutputType};
use serde::{Deserialize, Serialize};

/// What an output can physically do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Relay-like switching, optionally for a duration
    OnOff,
    /// Duty-cycle control
    Pwm,
    /// Dispense a volume
    Volume,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnOff => "on_off",
            Self::Pwm => "pwm",
            Self::Volume => "volume",
        }
    }
}

/// State an output is driven to once its driver is set up
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StartupState {
    #[default]
    Unchanged,
    Off,
    On,
    SetDutyCycle { duty_cycle: f64 },
}

/// State an output is driven to before its driver locks are released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    #[default]
    Unchanged,
    Off,
    On,
}

/// Configuration of a controllable actuator. Owned outside the runtime, read-only to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub capabilities: Vec<Capability>,
    /// Allow an "on" command while already on
    #[serde(default)]
    pub force_command: bool,
    /// Log state transitions at info instead of debug
    #[serde(default)]
    pub log_level_debug: bool,
    #[serde(default)]
    pub startup: StartupState,
    #[serde(default)]
    pub shutdown: ShutdownState,
    /// Evaluate triggers for the startup transition
    #[serde(default)]
    pub trigger_at_startup: bool,
}

impl Output {
    pub fn new(id: OutputId, name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            id,
            name: name.into(),
            capabilities,
            force_command: false,
            log_level_debug: false,
            startup: StartupState::default(),
            shutdown: ShutdownState::default(),
            trigger_at_startup: false,
        }
    }

    pub fn with_force_command(mut self, force: bool) -> Self {
        self.force_command = force;
        self
    }

    pub fn with_startup(mut self, startup: StartupState) -> Self {
        self.startup = startup;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownState) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_log_level_debug(mut self, enabled: bool) -> Self {
        self.log_level_debug = enabled;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Capability required to honor a command of the given output type
    pub fn supports_type(&self, output_type: OutputType) -> bool {
        self.supports(output_type.required_capability())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_capabilities() {
        let output = Output::new(
            OutputId::new("dimmer").unwrap(),
            "Dimmer",
            vec![Capability::Pwm],
        );
        assert!(output.supports(Capability::Pwm));
        assert!(!output.supports(Capability::OnOff));
        assert!(output.supports_type(OutputType::Pwm));
        assert!(!output.supports_type(OutputType::Sec));
    }

    #[test]
    fn test_output_deserialization_defaults() {
        let output: Output = serde_json::from_value(serde_json::json!({
            "id": "relay-1",
            "name": "Relay 1",
            "capabilities": ["on_off"]
        }))
        .unwrap();

        assert!(!output.force_command);
        assert_eq!(output.startup, StartupState::Unchanged);
        assert_eq!(output.shutdown, ShutdownState::Unchanged);
    }

    #[test]
    fn test_startup_duty_cycle_deserialization() {
        let startup: StartupState =
            serde_json::from_value(serde_json::json!({"state": "set_duty_cycle", "duty_cycle": 40.0}))
                .unwrap();
        assert_eq!(startup, StartupState::SetDutyCycle { duty_cycle: 40.0 });
    }
}
