use async_trait::async_trait;
use domain::driver::OutputDriver;
use domain::output::{OutputState, OutputType, SwitchState};
use domain::DomainError;
use std::time::Duration;

use super::LockFile;

/// In-memory relay. With a lock file it serializes writes against other
/// drivers on the same bus.
pub struct SimulatedRelay {
    state: OutputState,
    setup: bool,
    lock: Option<LockFile>,
}

impl SimulatedRelay {
    pub fn new(lock_file: Option<String>, lock_timeout: Duration) -> Self {
        Self {
            state: OutputState::Off,
            setup: false,
            lock: lock_file.map(|path| LockFile::new(path, lock_timeout)),
        }
    }
}

#[async_trait]
impl OutputDriver for SimulatedRelay {
    async fn setup(&mut self) -> Result<(), DomainError> {
        self.setup = true;
        tracing::info!(lock_file = ?self.lock.as_ref().map(|l| l.path().display().to_string()), "Simulated relay ready");
        Ok(())
    }

    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        _amount: Option<f64>,
    ) -> Result<(), DomainError> {
        if output_type != OutputType::Sec && state == SwitchState::On {
            return Err(DomainError::Driver(format!(
                "Relay cannot switch on with output type {}",
                output_type.as_str()
            )));
        }

        if let Some(lock) = self.lock.as_mut() {
            lock.acquire().await?;
        }

        self.state = match state {
            SwitchState::On => OutputState::On,
            SwitchState::Off => OutputState::Off,
        };
        tracing::debug!(state = state.as_str(), "Relay switched");

        // The write has happened; a stuck lock stays held until release_locks.
        if let Some(lock) = self.lock.as_mut() {
            if let Err(e) = lock.release().await {
                tracing::warn!(error = %e, "Lock not released after switch");
            }
        }
        Ok(())
    }

    fn is_on(&self) -> OutputState {
        self.state
    }

    fn is_setup(&self) -> bool {
        self.setup
    }

    async fn release_locks(&mut self) -> Result<(), DomainError> {
        match self.lock.as_mut() {
            Some(lock) => lock.release().await,
            None => Ok(()),
        }
    }

    fn driver_type(&self) -> &str {
        "simulated_relay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relay_switches() {
        let mut relay = SimulatedRelay::new(None, Duration::from_secs(1));
        relay.setup().await.unwrap();

        relay.switch(SwitchState::On, OutputType::Sec, Some(10.0)).await.unwrap();
        assert_eq!(relay.is_on(), OutputState::On);

        relay.switch(SwitchState::Off, OutputType::Sec, None).await.unwrap();
        assert_eq!(relay.is_on(), OutputState::Off);
    }

    #[tokio::test]
    async fn test_relay_refuses_pwm() {
        let mut relay = SimulatedRelay::new(None, Duration::from_secs(1));
        relay.setup().await.unwrap();

        let result = relay.switch(SwitchState::On, OutputType::Pwm, Some(50.0)).await;
        assert!(matches!(result, Err(DomainError::Driver(_))));
        assert_eq!(relay.is_on(), OutputState::Off);
    }

    #[tokio::test]
    async fn test_lock_not_left_behind() {
        let path = std::env::temp_dir().join(format!("relay-{}.lock", uuid::Uuid::new_v4()));
        let mut relay = SimulatedRelay::new(
            Some(path.to_string_lossy().into_owned()),
            Duration::from_secs(1),
        );
        relay.setup().await.unwrap();

        relay.switch(SwitchState::On, OutputType::Sec, None).await.unwrap();
        assert!(!path.exists());

        relay.release_locks().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_lock_release_still_reports_switch() {
        // A directory at the lock path cannot be removed as a file.
        let path = std::env::temp_dir().join(format!("relay-{}.lock", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();

        let mut relay = SimulatedRelay::new(
            Some(path.to_string_lossy().into_owned()),
            Duration::from_secs(1),
        );
        relay.setup().await.unwrap();
        if let Some(lock) = relay.lock.as_mut() {
            lock.mark_held();
        }

        relay.switch(SwitchState::On, OutputType::Sec, None).await.unwrap();

        assert_eq!(relay.is_on(), OutputState::On);
        assert!(relay.lock.as_ref().is_some_and(|l| l.is_held()));
        assert!(relay.release_locks().await.is_err());

        std::fs::remove_dir_all(&path).unwrap();
    }
}
