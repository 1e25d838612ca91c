use crate::output::OutputManager;
use domain::output::{ManipulateRequest, OutputId};
use infrastructure::MqttClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Output command as received on `outputs/cmd/{daemon_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct OutputCommand {
    pub output_id: String,
    #[serde(flatten)]
    pub request: ManipulateRequest,
}

/// Reply published on `outputs/reply/{daemon_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub output_id: Option<String>,
    pub code: u8,
    pub message: String,
}

impl CommandReply {
    fn error(output_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            output_id,
            code: 1,
            message: message.into(),
        }
    }
}

pub struct CommandListener {
    mqtt_client: MqttClient,
    daemon_id: String,
    manager: Arc<OutputManager>,
}

impl CommandListener {
    pub fn new(mqtt_client: MqttClient, daemon_id: String, manager: Arc<OutputManager>) -> Self {
        Self {
            mqtt_client,
            daemon_id,
            manager,
        }
    }

    pub fn command_topic(&self) -> String {
        format!("outputs/cmd/{}", self.daemon_id)
    }

    pub fn reply_topic(&self) -> String {
        format!("outputs/reply/{}", self.daemon_id)
    }

    pub async fn start(&self, cancel_token: CancellationToken) {
        let topic = self.command_topic();
        if let Err(e) = self.mqtt_client.subscribe(&topic).await {
            error!(daemon_id = %self.daemon_id, error = %e, "Failed to subscribe to commands");
            return;
        }

        info!(daemon_id = %self.daemon_id, topic = %topic, "📥 Listening for output commands");

        let mut rx = self.mqtt_client.subscribe_messages();

        loop {
            let received = tokio::select! {
                _ = cancel_token.cancelled() => break,
                received = rx.recv() => received,
            };

            match received {
                Ok(msg) => {
                    if msg.topic != topic {
                        continue;
                    }

                    let reply = handle_payload(&self.manager, &msg.payload).await;
                    match serde_json::to_string(&reply) {
                        Ok(json) => {
                            if let Err(e) =
                                self.mqtt_client.publish(&self.reply_topic(), &json, false).await
                            {
                                warn!(daemon_id = %self.daemon_id, error = %e, "Failed to publish reply");
                            }
                        }
                        Err(e) => error!(error = %e, "Failed to serialize reply"),
                    }

                    if let Err(e) = self.mqtt_client.ack(&msg.topic, msg.pkid).await {
                        warn!(daemon_id = %self.daemon_id, error = %e, "Failed to ack command");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(daemon_id = %self.daemon_id, skipped = count, "Command listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(daemon_id = %self.daemon_id, "Command channel closed");
                    break;
                }
            }
        }

        info!(daemon_id = %self.daemon_id, "Command listener stopped");
    }
}

/// Decode one command payload, apply it and build the reply
pub async fn handle_payload(manager: &OutputManager, payload: &[u8]) -> CommandReply {
    let command: OutputCommand = match serde_json::from_slice(payload) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Received malformed output command");
            return CommandReply::error(None, format!("Malformed command: {}", e));
        }
    };

    info!(output_id = %command.output_id, state = %command.request.state, "Received output command");

    let output_id = match OutputId::new(&command.output_id) {
        Ok(id) => id,
        Err(e) => return CommandReply::error(Some(command.output_id), e.to_string()),
    };

    match manager.manipulate(&output_id, command.request).await {
        Ok(outcome) => CommandReply {
            output_id: Some(command.output_id),
            code: outcome.code(),
            message: outcome.message,
        },
        Err(e) => CommandReply::error(Some(command.output_id), e.to_string()),
    }
}
