use async_trait::async_trait;
use domain::DomainError;
use domain::trigger::ActionDispatcher;
use tracing::info;

/// Dispatcher used when no action runner is reachable; only logs
pub struct LoggingActionDispatcher;

#[async_trait]
impl ActionDispatcher for LoggingActionDispatcher {
    async fn dispatch(&self, rule_id: &str, message: &str) -> Result<(), DomainError> {
        info!(rule_id = %rule_id, message = %message, "⚡ [LOG] TRIGGER ACTIONS");
        Ok(())
    }
}
