pub mod action_dispatcher;
pub mod mqtt_client;

pub use action_dispatcher::MqttActionDispatcher;
