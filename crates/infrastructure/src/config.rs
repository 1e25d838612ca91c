use config::{Config, ConfigError, Environment, File};
use domain::output::{Capability, Output, OutputId, ShutdownState, StartupState};
use domain::trigger::TriggerRule;
use domain::DomainError;
use serde::{Deserialize, Serialize};

use crate::drivers::DriverConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// sqlx connection string, e.g. `sqlite://outputs.db?mode=rwc`
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://outputs.db?mode=rwc".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecorderConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}
fn default_workers() -> usize {
    2
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    pub id: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub force_command: bool,
    #[serde(default)]
    pub log_level_debug: bool,
    #[serde(default)]
    pub startup: StartupState,
    #[serde(default)]
    pub shutdown: ShutdownState,
    #[serde(default)]
    pub trigger_at_startup: bool,
    pub driver: DriverConfig,
}

impl OutputConfig {
    pub fn to_output(&self) -> Result<Output, DomainError> {
        if self.capabilities.is_empty() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Output {} declares no capabilities",
                self.id
            )));
        }

        let mut output = Output::new(OutputId::new(&self.id)?, &self.name, self.capabilities.clone())
            .with_force_command(self.force_command)
            .with_log_level_debug(self.log_level_debug)
            .with_startup(self.startup)
            .with_shutdown(self.shutdown);
        output.trigger_at_startup = self.trigger_at_startup;
        Ok(output)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DaemonConfig {
    pub daemon_id: String,
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default = "default_expiry_check_ms")]
    pub expiry_check_ms: u64,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
}

fn default_expiry_check_ms() -> u64 {
    250
}

impl DaemonConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Required so the daemon never starts without outputs defined
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // e.g. OUTPUTS__MQTT__HOST=10.0.0.1
            .add_source(Environment::with_prefix("OUTPUTS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Domain view of every configured output
    pub fn outputs(&self) -> Result<Vec<(Output, DriverConfig)>, DomainError> {
        self.outputs
            .iter()
            .map(|c| Ok((c.to_output()?, c.driver.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("output-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), contents).unwrap();
        dir
    }

    #[test]
    fn test_load_full_config() {
        let dir = write_config(
            r#"
daemon_id = "greenhouse"
expiry_check_ms = 100

[mqtt]
host = "broker.local"
port = 1883

[recorder]
queue_capacity = 32

[[outputs]]
id = "pump-1"
name = "Irrigation pump"
capabilities = ["on_off"]
startup = { state = "off" }
shutdown = "off"
driver = { type = "simulated_relay", lock_file = "/tmp/pump.lock" }

[[outputs]]
id = "fan-1"
name = "Exhaust fan"
capabilities = ["on_off", "pwm"]
startup = { state = "set_duty_cycle", duty_cycle = 30.0 }
driver = { type = "simulated_pwm", invert = true }

[[triggers]]
id = "a1b2-long-run"
name = "Long run"
output_id = "pump-1"
trigger_type = "trigger_output"
output_state = "on_duration_greater_than"
output_duration = 15.0
"#,
        );

        let config = DaemonConfig::load(dir.to_str().unwrap()).unwrap();

        assert_eq!(config.daemon_id, "greenhouse");
        assert_eq!(config.mqtt.as_ref().unwrap().port, 1883);
        assert_eq!(config.recorder.queue_capacity, 32);
        assert_eq!(config.recorder.workers, 2);
        assert_eq!(config.expiry_check_ms, 100);
        assert_eq!(config.triggers.len(), 1);

        let outputs = config.outputs().unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].0.startup, StartupState::Off);
        assert_eq!(outputs[0].0.shutdown, ShutdownState::Off);
        assert_eq!(
            outputs[1].0.startup,
            StartupState::SetDutyCycle { duty_cycle: 30.0 }
        );
        assert!(matches!(
            outputs[1].1,
            DriverConfig::SimulatedPwm { invert: true }
        ));
    }

    #[test]
    fn test_defaults_without_optional_sections() {
        let dir = write_config("daemon_id = \"bare\"\n");

        let config = DaemonConfig::load(dir.to_str().unwrap()).unwrap();

        assert!(config.mqtt.is_none());
        assert_eq!(config.recorder.queue_capacity, 256);
        assert_eq!(config.expiry_check_ms, 250);
        assert!(config.storage.database_url.starts_with("sqlite://"));
        assert!(config.outputs.is_empty());
    }

    #[test]
    fn test_missing_default_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("output-config-{}", uuid::Uuid::new_v4()));
        assert!(DaemonConfig::load(dir.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_invalid_output_id_rejected() {
        let config = OutputConfig {
            id: "pump 1".to_string(),
            name: "Pump".to_string(),
            capabilities: vec![Capability::OnOff],
            force_command: false,
            log_level_debug: false,
            startup: StartupState::Unchanged,
            shutdown: ShutdownState::Unchanged,
            trigger_at_startup: false,
            driver: DriverConfig::SimulatedRelay {
                lock_file: None,
                lock_timeout_ms: 1000,
            },
        };

        assert!(matches!(
            config.to_output(),
            Err(DomainError::InvalidOutputId(_))
        ));
    }
}
