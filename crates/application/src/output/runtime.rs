use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use domain::clock::Clock;
use domain::driver::OutputDriver;
use domain::measurement::MeasurementSample;
use domain::output::{
    Capability, Command, DutyCycleReading, ManipulateOutcome, ManipulateRequest, Output,
    OutputRuntimeState, OutputType, RunMode, ShutdownState, StartupState, SwitchState,
};
use domain::DomainError;

use crate::recorder::DurationRecorder;
use crate::trigger::TriggerEvaluator;

/// In-memory state machine of a single output.
///
/// Takes `&mut self` for every transition; callers sharing a runtime must
/// serialize access (see `OutputManager`).
pub struct OutputRuntime {
    output: Output,
    driver: Box<dyn OutputDriver>,
    state: OutputRuntimeState,
    recorder: DurationRecorder,
    triggers: Arc<TriggerEvaluator>,
    clock: Arc<dyn Clock>,
}

impl OutputRuntime {
    pub fn new(
        output: Output,
        driver: Box<dyn OutputDriver>,
        recorder: DurationRecorder,
        triggers: Arc<TriggerEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = OutputRuntimeState::new(clock.now());
        Self {
            output,
            driver,
            state,
            recorder,
            triggers,
            clock,
        }
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn state(&self) -> &OutputRuntimeState {
        &self.state
    }

    pub fn is_setup(&self) -> bool {
        self.state.is_setup() && self.driver.is_setup()
    }

    /// Set up the driver and drive the output to its configured startup state
    pub async fn setup(&mut self) -> Result<(), DomainError> {
        let started = Instant::now();

        self.driver.setup().await?;
        self.state.mark_setup(self.driver.is_setup());

        let request = match self.output.startup {
            StartupState::Unchanged => None,
            StartupState::Off => Some(ManipulateRequest::off()),
            StartupState::On => Some(ManipulateRequest::on()),
            StartupState::SetDutyCycle { duty_cycle } => Some(
                ManipulateRequest::on()
                    .output_type(OutputType::Pwm)
                    .amount(duty_cycle),
            ),
        };

        if let Some(mut request) = request {
            request.trigger_conditionals = self.output.trigger_at_startup;
            let outcome = self.manipulate(request).await;
            if !outcome.is_accepted() {
                warn!(output_id = %self.output.id, message = %outcome.message, "Startup state not applied");
            }
        }

        info!(
            output_id = %self.output.id,
            driver = self.driver.driver_type(),
            "Initialized in {:.1} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    /// Apply an on/off, duration, duty-cycle or volume request.
    ///
    /// Rejections (code 1) leave the runtime and the hardware untouched.
    pub async fn manipulate(&mut self, request: ManipulateRequest) -> ManipulateOutcome {
        debug!(
            output_id = %self.output.id,
            state = %request.state,
            output_type = ?request.output_type,
            amount = ?request.amount,
            min_off = request.min_off,
            trigger_conditionals = request.trigger_conditionals,
            "manipulate"
        );

        let switch_state = match SwitchState::from_token(&request.state) {
            Ok(state) => state,
            Err(e) => return self.reject(e.to_string()),
        };
        let amount = request.amount_or_zero();

        if !self.is_setup() {
            return self.reject("Cannot manipulate Output: not set up.".to_string());
        }

        let Some(command) =
            Command::resolve(switch_state, request.output_type, amount, &self.output)
        else {
            return self.reject(format!(
                "Output {} ({}) cannot handle \"{}\" with output type {}.",
                self.output.id,
                self.output.name,
                switch_state.as_str(),
                request.output_type.map_or("none", |t| t.as_str())
            ));
        };

        let now = self.clock.now();
        let outcome = match command {
            Command::Volume { amount } => self.dispense(amount).await,
            Command::DutyCycle { duty_cycle } => self.set_duty_cycle(now, duty_cycle).await,
            Command::Timed { seconds } => self.turn_on_timed(now, seconds, request.min_off).await,
            Command::Indefinite => self.turn_on_indefinite(now).await,
            Command::Off { output_type } => self.turn_off(now, output_type).await,
        };

        if outcome.is_accepted() {
            self.log_transition(&outcome.message);
            if request.trigger_conditionals {
                self.triggers
                    .check_triggers(&self.output, self.driver.is_on(), amount)
                    .await;
            }
        }

        outcome
    }

    /// Seconds the output has been on in its current run
    pub fn seconds_currently_on(&self) -> f64 {
        self.state
            .seconds_on(self.driver.is_on().is_on(), self.clock.now())
    }

    pub fn run_mode(&self) -> RunMode {
        self.state.run_mode(self.driver.is_on())
    }

    /// Turn the output off once its timed window has run out
    pub async fn expire_if_due(&mut self) -> Option<ManipulateOutcome> {
        if !self.state.timed_expired(self.clock.now()) {
            return None;
        }

        self.state.latch_off_triggered();
        debug!(output_id = %self.output.id, "Timed window elapsed, turning off");
        Some(self.manipulate(ManipulateRequest::off()).await)
    }

    /// Drive the configured shutdown state and release driver locks. Never fails.
    pub async fn shutdown(&mut self) {
        let started = Instant::now();

        let request = match self.output.shutdown {
            ShutdownState::Unchanged => None,
            ShutdownState::Off => Some(ManipulateRequest::off().without_triggers()),
            ShutdownState::On => Some(ManipulateRequest::on().without_triggers()),
        };
        if let Some(request) = request {
            let outcome = self.manipulate(request).await;
            if !outcome.is_accepted() {
                warn!(output_id = %self.output.id, message = %outcome.message, "Shutdown state not applied");
            }
        }

        if let Err(e) = self.driver.release_locks().await {
            warn!(output_id = %self.output.id, error = %e, "Failed to release driver locks");
        }
        self.state.mark_setup(false);

        info!(
            output_id = %self.output.id,
            "Stopped in {:.1} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
    }

    async fn dispense(&mut self, amount: f64) -> ManipulateOutcome {
        if let Err(e) = self
            .driver
            .switch(SwitchState::On, OutputType::Vol, Some(amount))
            .await
        {
            return self.driver_failed(e);
        }

        self.state.start_volume();
        ManipulateOutcome::accepted(format!(
            "Command sent: Output {} ({}) volume: {:.1}",
            self.output.id, self.output.name, amount
        ))
    }

    async fn set_duty_cycle(&mut self, now: DateTime<Utc>, duty_cycle: f64) -> ManipulateOutcome {
        if let Err(e) = self
            .driver
            .switch(SwitchState::On, OutputType::Pwm, Some(duty_cycle))
            .await
        {
            return self.driver_failed(e);
        }

        self.state.start_duty_cycle();
        self.record_duty_cycle(now);
        ManipulateOutcome::accepted(format!(
            "Command sent: Output {} ({}) duty cycle: {:.2}",
            self.output.id, self.output.name, duty_cycle
        ))
    }

    async fn turn_on_timed(&mut self, now: DateTime<Utc>, seconds: f64, min_off: f64) -> ManipulateOutcome {
        // Interlock applies to the next plain "on", whatever happens below.
        self.state.arm_interlock(now, seconds, min_off);

        let output_is_on = self.driver.is_on().is_on();

        if output_is_on && self.state.on_duration() {
            let previous = self.state.last_duration().abs();
            let remaining = self.state.remaining_secs(now);
            let served = self.state.renew_timed(now, seconds);
            if let Some(elapsed) = served {
                self.recorder
                    .record(MeasurementSample::duration_time(self.output.id.clone(), elapsed));
            }
            return ManipulateOutcome::accepted(format!(
                "Output {} ({}) already on for {:.2} seconds ({:.2} remaining). \
                 Recorded {:.2} seconds on and renewed for {:.2} seconds.",
                self.output.id,
                self.output.name,
                previous,
                remaining,
                served.map_or(0.0, |e| e.seconds.abs()),
                seconds.abs()
            ));
        }

        if output_is_on {
            if let Some(elapsed) = self.state.convert_to_timed(now, seconds) {
                self.recorder
                    .record(MeasurementSample::duration_time(self.output.id.clone(), elapsed));
            }
            return ManipulateOutcome::accepted(format!(
                "Output {} ({}) was on without a duration; now on for {:.1} seconds.",
                self.output.id,
                self.output.name,
                seconds.abs()
            ));
        }

        if let Err(e) = self
            .driver
            .switch(SwitchState::On, OutputType::Sec, Some(seconds))
            .await
        {
            return self.driver_failed(e);
        }

        self.state.start_timed(now, seconds);
        ManipulateOutcome::accepted(format!(
            "Output {} ({}) on for {:.1} seconds.",
            self.output.id,
            self.output.name,
            seconds.abs()
        ))
    }

    async fn turn_on_indefinite(&mut self, now: DateTime<Utc>) -> ManipulateOutcome {
        if self.driver.is_on().is_on() && !self.output.force_command {
            return self.reject(format!(
                "Output {} ({}) is already on.",
                self.output.id, self.output.name
            ));
        }

        if let Some(remaining) = self.state.interlock_remaining(now) {
            return self.reject(format!(
                "Output {} ({}) instructed to turn on, but must stay off for {:.2} more seconds.",
                self.output.id, self.output.name, remaining
            ));
        }

        if let Err(e) = self
            .driver
            .switch(SwitchState::On, OutputType::Sec, None)
            .await
        {
            return self.driver_failed(e);
        }

        if let Some(elapsed) = self.state.start_indefinite(now) {
            self.recorder
                .record(MeasurementSample::duration_time(self.output.id.clone(), elapsed));
        }
        ManipulateOutcome::accepted(format!(
            "Output {} ({}) ON at {}.",
            self.output.id,
            self.output.name,
            self.state
                .time_turned_on()
                .unwrap_or(now)
                .format("%Y-%m-%d %H:%M:%S")
        ))
    }

    async fn turn_off(&mut self, now: DateTime<Utc>, output_type: OutputType) -> ManipulateOutcome {
        if let Err(e) = self
            .driver
            .switch(SwitchState::Off, output_type, None)
            .await
        {
            return self.driver_failed(e);
        }

        if let Some(elapsed) = self.state.stop(now) {
            self.recorder
                .record(MeasurementSample::duration_time(self.output.id.clone(), elapsed));
        }
        self.record_duty_cycle(now);

        ManipulateOutcome::accepted(format!(
            "Output {} ({}) OFF at {}.",
            self.output.id,
            self.output.name,
            now.format("%Y-%m-%d %H:%M:%S")
        ))
    }

    fn record_duty_cycle(&self, now: DateTime<Utc>) {
        if !self.output.supports(Capability::Pwm) {
            return;
        }
        let percent = match self.driver.is_on().duty_cycle() {
            DutyCycleReading::Percent(duty) => duty,
            DutyCycleReading::Off => 0.0,
        };
        self.recorder.record(MeasurementSample::duty_cycle(
            self.output.id.clone(),
            percent,
            now,
        ));
    }

    fn driver_failed(&self, e: DomainError) -> ManipulateOutcome {
        error!(output_id = %self.output.id, error = %e, "Driver switch failed");
        ManipulateOutcome::rejected(format!(
            "Output {} ({}) switch failed: {}",
            self.output.id, self.output.name, e
        ))
    }

    fn reject(&self, message: String) -> ManipulateOutcome {
        if self.output.log_level_debug {
            info!(output_id = %self.output.id, "{}", message);
        } else {
            debug!(output_id = %self.output.id, "{}", message);
        }
        ManipulateOutcome::rejected(message)
    }

    fn log_transition(&self, message: &str) {
        if self.output.log_level_debug {
            info!(output_id = %self.output.id, "{}", message);
        } else {
            debug!(output_id = %self.output.id, "{}", message);
        }
    }
}
