use crate::messaging::mqtt_client::MqttPublisherClient;
use async_trait::async_trait;
use domain::DomainError;
use domain::trigger::ActionDispatcher;
use rumqttc::QoS;
use serde_json::json;
use std::sync::Arc;

/// Publishes matched trigger rules on `outputs/actions/{rule_id}` for
/// whatever runs the rule's actions.
pub struct MqttActionDispatcher {
    client: Arc<dyn MqttPublisherClient>,
}

impl MqttActionDispatcher {
    pub fn new(client: Arc<dyn MqttPublisherClient>) -> Self {
        Self { client }
    }

    pub fn topic(rule_id: &str) -> String {
        format!("outputs/actions/{}", rule_id)
    }
}

#[async_trait]
impl ActionDispatcher for MqttActionDispatcher {
    async fn dispatch(&self, rule_id: &str, message: &str) -> Result<(), DomainError> {
        if !self.client.is_connected() {
            return Err(DomainError::Dispatch(format!(
                "Broker offline, actions of rule {} not sent",
                rule_id
            )));
        }

        let payload = json!({
            "rule_id": rule_id,
            "message": message,
        });

        self.client
            .publish_bytes(
                &Self::topic(rule_id),
                payload.to_string().as_bytes(),
                QoS::AtLeastOnce,
                false,
            )
            .await
            .map_err(|e| DomainError::Dispatch(e.to_string()))?;

        tracing::debug!(rule_id, "Trigger actions published");
        Ok(())
    }
}
