use super::{TriggerClass, TriggerRule};
use crate::DomainError;
use crate::output::OutputId;
use async_trait::async_trait;

/// Repository interface for trigger rule persistence
///
/// Rules are created and edited outside the daemon, so callers query on
/// every evaluation instead of caching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TriggerRuleRepository: Send + Sync {
    /// Active rules of `class` bound to `output_id`, in no particular order
    async fn find_active(
        &self,
        output_id: &OutputId,
        class: TriggerClass,
    ) -> Result<Vec<TriggerRule>, DomainError>;

    /// Insert or replace a rule
    async fn save(&self, rule: &TriggerRule) -> Result<(), DomainError>;
}
