use async_trait::async_trait;
use domain::driver::OutputDriver;
use domain::output::{OutputState, OutputType, SwitchState};
use domain::DomainError;
use tokio::process::Command;
use tracing::{debug, info};

use super::PwmSignal;

const DUTY_CYCLE_PLACEHOLDER: &str = "((duty_cycle))";

/// PWM channel driven by a user-supplied shell command.
///
/// `((duty_cycle))` in the command is replaced by the (possibly inverted)
/// duty cycle before it is run through `sh -c`.
pub struct ShellPwm {
    command: String,
    invert: bool,
    signal: PwmSignal,
    setup: bool,
}

impl ShellPwm {
    pub fn new(command: String, invert: bool) -> Self {
        Self {
            command,
            invert,
            signal: PwmSignal::off(invert),
            setup: false,
        }
    }

    fn render(&self, raw: f64) -> String {
        self.command.replace(DUTY_CYCLE_PLACEHOLDER, &raw.to_string())
    }
}

#[async_trait]
impl OutputDriver for ShellPwm {
    async fn setup(&mut self) -> Result<(), DomainError> {
        if self.command.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "Shell PWM output must have a command set".to_string(),
            ));
        }
        self.setup = true;
        info!(command = %self.command, invert = self.invert, "Shell PWM ready");
        Ok(())
    }

    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
    ) -> Result<(), DomainError> {
        let signal = PwmSignal::resolve(state, output_type, amount, self.invert)?;
        let cmd = self.render(signal.raw);

        let output = Command::new("sh")
            .arg("-c")
            .arg(&cmd)
            .output()
            .await
            .map_err(|e| DomainError::Driver(format!("Failed to run `{}`: {}", cmd, e)))?;

        debug!(
            duty_cycle = signal.raw,
            status = ?output.status.code(),
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Duty cycle command returned"
        );

        if !output.status.success() {
            return Err(DomainError::Driver(format!(
                "`{}` exited with {}",
                cmd, output.status
            )));
        }

        self.signal = signal;
        Ok(())
    }

    fn is_on(&self) -> OutputState {
        self.signal.state()
    }

    fn is_setup(&self) -> bool {
        self.setup
    }

    async fn release_locks(&mut self) -> Result<(), DomainError> {
        Ok(())
    }

    fn driver_type(&self) -> &str {
        "shell_pwm"
    }
}
