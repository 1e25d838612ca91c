use super::OutputState;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which "on" mode an output is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Off,
    OnIndefinite,
    OnTimed,
    OnDutyCycle,
    OnVolume,
}

/// Elapsed on-time of a finished (or renewed) interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedOn {
    /// Signed seconds; negative for reverse-running actuators
    pub seconds: f64,
    /// When the interval began
    pub started_at: DateTime<Utc>,
}

pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

pub(crate) fn duration_to_secs(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => duration.num_seconds() as f64,
    }
}

/// Timing state of one output.
///
/// An output is either in duration mode (`on_duration`, bounded by `on_until`)
/// or in indefinite mode (`time_turned_on` set), never both. `off_until` is the
/// earliest time a plain "on" is accepted again.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRuntimeState {
    is_setup: bool,
    mode: RunMode,
    on_duration: bool,
    on_until: DateTime<Utc>,
    off_until: Option<DateTime<Utc>>,
    last_duration: f64,
    time_turned_on: Option<DateTime<Utc>>,
    off_triggered: bool,
}

impl OutputRuntimeState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_setup: false,
            mode: RunMode::Off,
            on_duration: false,
            on_until: now,
            off_until: None,
            last_duration: 0.0,
            time_turned_on: None,
            off_triggered: false,
        }
    }

    pub fn is_setup(&self) -> bool {
        self.is_setup
    }

    pub fn mark_setup(&mut self, is_setup: bool) {
        self.is_setup = is_setup;
    }

    pub fn on_duration(&self) -> bool {
        self.on_duration
    }

    pub fn on_until(&self) -> DateTime<Utc> {
        self.on_until
    }

    pub fn off_until(&self) -> Option<DateTime<Utc>> {
        self.off_until
    }

    pub fn last_duration(&self) -> f64 {
        self.last_duration
    }

    pub fn time_turned_on(&self) -> Option<DateTime<Utc>> {
        self.time_turned_on
    }

    pub fn off_triggered(&self) -> bool {
        self.off_triggered
    }

    /// Seconds left in the current timed window, zero once it has passed
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> f64 {
        if self.on_until > now {
            duration_to_secs(self.on_until - now)
        } else {
            0.0
        }
    }

    /// Seconds of mandatory off-time still to run, if the interlock is active
    pub fn interlock_remaining(&self, now: DateTime<Utc>) -> Option<f64> {
        match self.off_until {
            Some(off_until) if off_until > now => Some(duration_to_secs(off_until - now)),
            _ => None,
        }
    }

    /// Set the interlock for a timed run: no plain "on" before `now + |amount| + min_off`.
    pub fn arm_interlock(&mut self, now: DateTime<Utc>, amount: f64, min_off: f64) {
        if min_off > 0.0 {
            self.off_until = Some(now + secs_to_duration(amount.abs() + min_off));
        }
    }

    /// Restart the timed window of an output already on for a duration.
    ///
    /// Returns the portion of the old window that has been served, signed
    /// like the old duration, when it is positive.
    pub fn renew_timed(&mut self, now: DateTime<Utc>, amount: f64) -> Option<ElapsedOn> {
        let served = self.last_duration.abs() - self.remaining_secs(now);
        let elapsed = (served > 0.0).then(|| ElapsedOn {
            seconds: served.copysign(self.last_duration),
            started_at: now - secs_to_duration(served),
        });

        self.on_until = now + secs_to_duration(amount.abs());
        self.last_duration = amount;
        self.mode = RunMode::OnTimed;
        elapsed
    }

    /// Turn an indefinite run into a timed one without touching the hardware.
    ///
    /// The indefinite portion is closed off and returned so that it can be recorded.
    pub fn convert_to_timed(&mut self, now: DateTime<Utc>, amount: f64) -> Option<ElapsedOn> {
        let elapsed = self.time_turned_on.take().and_then(|started_at| {
            let seconds = duration_to_secs(now - started_at);
            (seconds > 0.0).then_some(ElapsedOn {
                seconds,
                started_at,
            })
        });

        self.start_timed(now, amount);
        elapsed
    }

    /// Record the start of a timed run
    pub fn start_timed(&mut self, now: DateTime<Utc>, amount: f64) {
        self.on_duration = true;
        self.on_until = now + secs_to_duration(amount.abs());
        self.last_duration = amount;
        self.mode = RunMode::OnTimed;
    }

    /// Record the start of an indefinite run; a run already in progress keeps its start.
    ///
    /// A timed window still open is closed off first and its served portion
    /// returned, signed like its duration.
    pub fn start_indefinite(&mut self, now: DateTime<Utc>) -> Option<ElapsedOn> {
        let elapsed = if self.on_duration {
            let served = self.last_duration.abs() - self.remaining_secs(now);
            self.on_duration = false;
            self.on_until = now;
            (served > 0.0).then(|| ElapsedOn {
                seconds: served.copysign(self.last_duration),
                started_at: now - secs_to_duration(served),
            })
        } else {
            None
        };

        if self.time_turned_on.is_none() {
            self.time_turned_on = Some(now);
        }
        self.mode = RunMode::OnIndefinite;
        elapsed
    }

    pub fn start_duty_cycle(&mut self) {
        self.mode = RunMode::OnDutyCycle;
    }

    pub fn start_volume(&mut self) {
        self.mode = RunMode::OnVolume;
    }

    /// Reconcile whichever on-mode was active after the output went off.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<ElapsedOn> {
        let elapsed = if self.on_duration {
            let served = self.last_duration.abs() - self.remaining_secs(now);
            self.on_duration = false;
            self.on_until = now;
            Some(ElapsedOn {
                seconds: served.copysign(self.last_duration),
                started_at: now - secs_to_duration(served),
            })
        } else if let Some(started_at) = self.time_turned_on.take() {
            Some(ElapsedOn {
                seconds: duration_to_secs(now - started_at),
                started_at,
            })
        } else {
            None
        };

        self.time_turned_on = None;
        self.off_triggered = false;
        self.mode = RunMode::Off;
        elapsed
    }

    /// A timed window has ended and no off has been issued for it yet
    pub fn timed_expired(&self, now: DateTime<Utc>) -> bool {
        self.on_duration && self.on_until <= now && !self.off_triggered
    }

    /// Latch that an off has been issued for the expired window
    pub fn latch_off_triggered(&mut self) {
        self.off_triggered = true;
    }

    /// Seconds the output has been on in its current run
    pub fn seconds_on(&self, is_on: bool, now: DateTime<Utc>) -> f64 {
        if !is_on {
            return 0.0;
        }
        if self.on_duration {
            self.last_duration.abs() - self.remaining_secs(now)
        } else if let Some(started_at) = self.time_turned_on {
            duration_to_secs(now - started_at)
        } else {
            0.0
        }
    }

    /// Mode as seen through the driver's live state
    pub fn run_mode(&self, reported: OutputState) -> RunMode {
        if !reported.is_on() {
            return RunMode::Off;
        }
        match (self.mode, reported) {
            (RunMode::Off, OutputState::DutyCycle(_)) => RunMode::OnDutyCycle,
            (RunMode::Off, _) => RunMode::OnIndefinite,
            (mode, _) => mode,
        }
    }
}
