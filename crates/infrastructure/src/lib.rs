//! Infrastructure layer - External integrations

pub mod config;
pub mod database;
pub mod drivers;
pub mod messaging;

pub use database::{SqliteMeasurementStore, SqliteTriggerRuleRepository};
pub use drivers::{DriverConfig, DriverFactory};
pub use messaging::action_dispatcher::MqttActionDispatcher;
pub use messaging::mqtt_client::{MqttClient, MqttMessage, MqttPublisherClient};
