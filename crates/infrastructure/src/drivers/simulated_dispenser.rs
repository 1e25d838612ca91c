use async_trait::async_trait;
use domain::driver::OutputDriver;
use domain::output::{OutputState, OutputType, SwitchState};
use domain::DomainError;

/// In-memory volume dispenser. Each command dispenses at once, so the
/// output never reports itself as on.
pub struct SimulatedDispenser {
    dispensed_ml: f64,
    setup: bool,
}

impl SimulatedDispenser {
    pub fn new() -> Self {
        Self {
            dispensed_ml: 0.0,
            setup: false,
        }
    }

    pub fn dispensed_ml(&self) -> f64 {
        self.dispensed_ml
    }
}

impl Default for SimulatedDispenser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputDriver for SimulatedDispenser {
    async fn setup(&mut self) -> Result<(), DomainError> {
        self.setup = true;
        tracing::info!("Simulated dispenser ready");
        Ok(())
    }

    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
    ) -> Result<(), DomainError> {
        match (state, output_type) {
            (SwitchState::Off, _) => Ok(()),
            (SwitchState::On, OutputType::Vol) => {
                let volume = amount.unwrap_or(0.0);
                if volume <= 0.0 {
                    return Err(DomainError::Driver(format!(
                        "Cannot dispense {} ml",
                        volume
                    )));
                }
                self.dispensed_ml += volume;
                tracing::debug!(volume, total = self.dispensed_ml, "Dispensed");
                Ok(())
            }
            (SwitchState::On, other) => Err(DomainError::Driver(format!(
                "Dispenser cannot switch on with output type {}",
                other.as_str()
            ))),
        }
    }

    fn is_on(&self) -> OutputState {
        OutputState::Off
    }

    fn is_setup(&self) -> bool {
        self.setup
    }

    async fn release_locks(&mut self) -> Result<(), DomainError> {
        Ok(())
    }

    fn driver_type(&self) -> &str {
        "simulated_dispenser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispense_accumulates() {
        let mut pump = SimulatedDispenser::new();
        pump.setup().await.unwrap();

        pump.switch(SwitchState::On, OutputType::Vol, Some(5.0)).await.unwrap();
        pump.switch(SwitchState::On, OutputType::Vol, Some(2.5)).await.unwrap();

        assert_eq!(pump.dispensed_ml(), 7.5);
        assert_eq!(pump.is_on(), OutputState::Off);
    }

    #[tokio::test]
    async fn test_non_positive_volume_refused() {
        let mut pump = SimulatedDispenser::new();
        assert!(pump.switch(SwitchState::On, OutputType::Vol, Some(0.0)).await.is_err());
        assert!(pump.switch(SwitchState::On, OutputType::Sec, None).await.is_err());
    }
}
