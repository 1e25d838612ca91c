use crate::error::DomainError;
use crate::output::{ElapsedOn, OutputId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measurement series an output writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    DurationTime,
    DutyCycle,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DurationTime => "duration_time",
            Self::DutyCycle => "duty_cycle",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::DurationTime => "s",
            Self::DutyCycle => "percent",
        }
    }
}

/// One timestamped value headed for the time-series store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub output_id: OutputId,
    pub measurement: Measurement,
    pub channel: u32,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MeasurementSample {
    /// On-time of an interval, stamped at the moment the interval began
    pub fn duration_time(output_id: OutputId, elapsed: ElapsedOn) -> Self {
        Self {
            output_id,
            measurement: Measurement::DurationTime,
            channel: 0,
            value: elapsed.seconds,
            timestamp: elapsed.started_at,
        }
    }

    pub fn duty_cycle(output_id: OutputId, percent: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            output_id,
            measurement: Measurement::DutyCycle,
            channel: 0,
            value: percent,
            timestamp,
        }
    }

    pub fn unit(&self) -> &'static str {
        self.measurement.unit()
    }
}

/// Time-series store contract. Writes are best-effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn write_sample(&self, sample: &MeasurementSample) -> Result<(), DomainError>;
}
