use crate::DomainError;
use async_trait::async_trait;

/// Daemon-wide action runner. Fire-and-forget: callers only log failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, rule_id: &str, message: &str) -> Result<(), DomainError>;
}
