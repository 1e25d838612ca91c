use super::Operator;
use crate::error::{DomainError, Result};
use crate::output::{DutyCycleReading, OutputId};
use serde::{Deserialize, Serialize};

/// Which family of rules an evaluation pass selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerClass {
    #[serde(rename = "trigger_output")]
    Output,
    #[serde(rename = "trigger_output_pwm")]
    OutputPwm,
}

impl TriggerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Output => "trigger_output",
            Self::OutputPwm => "trigger_output_pwm",
        }
    }
}

impl std::str::FromStr for TriggerClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trigger_output" => Ok(Self::Output),
            "trigger_output_pwm" => Ok(Self::OutputPwm),
            other => Err(DomainError::InvalidConfiguration(format!(
                "Unknown trigger class: {other}"
            ))),
        }
    }
}

/// Whether a rule matches unconditionally or by comparing against a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    Always,
    Compare { operator: Operator, threshold: f64 },
}

impl Criterion {
    pub fn matches(&self, observed: f64) -> bool {
        match self {
            Self::Always => true,
            Self::Compare {
                operator,
                threshold,
            } => operator.evaluate(observed, *threshold),
        }
    }
}

/// State condition of a `trigger_output` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOffCondition {
    Off,
    OnDurationNone,
    OnDurationAny,
    OnDurationNoneAny,
    OnDurationEqual,
    OnDurationGreaterThan,
    OnDurationEqualGreaterThan,
    OnDurationLessThan,
    OnDurationEqualLessThan,
}

impl OnOffCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::OnDurationNone => "on_duration_none",
            Self::OnDurationAny => "on_duration_any",
            Self::OnDurationNoneAny => "on_duration_none_any",
            Self::OnDurationEqual => "on_duration_equal",
            Self::OnDurationGreaterThan => "on_duration_greater_than",
            Self::OnDurationEqualGreaterThan => "on_duration_equal_greater_than",
            Self::OnDurationLessThan => "on_duration_less_than",
            Self::OnDurationEqualLessThan => "on_duration_equal_less_than",
        }
    }

    /// Duration rules are eligible while the output is on, `off` while it is off
    pub fn eligible(&self, output_is_on: bool) -> bool {
        match self {
            Self::Off => !output_is_on,
            _ => output_is_on,
        }
    }

    /// How the requested amount is compared against `threshold`
    pub fn criterion(&self, threshold: f64) -> Criterion {
        let compare = |operator| Criterion::Compare {
            operator,
            threshold,
        };
        match self {
            Self::Off | Self::OnDurationNoneAny => Criterion::Always,
            Self::OnDurationNone => Criterion::Compare {
                operator: Operator::Equal,
                threshold: 0.0,
            },
            Self::OnDurationAny => Criterion::Compare {
                operator: Operator::NotEqual,
                threshold: 0.0,
            },
            Self::OnDurationEqual => compare(Operator::Equal),
            Self::OnDurationGreaterThan => compare(Operator::Greater),
            Self::OnDurationEqualGreaterThan => compare(Operator::GreaterOrEqual),
            Self::OnDurationLessThan => compare(Operator::Less),
            Self::OnDurationEqualLessThan => compare(Operator::LessOrEqual),
        }
    }
}

/// Comparison of a `trigger_output_pwm` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyCycleCondition {
    Above,
    Below,
    Equal,
}

impl DutyCycleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Equal => "equal",
        }
    }

    fn operator(&self) -> Operator {
        match self {
            Self::Above => Operator::Greater,
            Self::Below => Operator::Less,
            Self::Equal => Operator::Equal,
        }
    }

    /// An output that is off matches `equal 0` and `below` any non-zero threshold.
    pub fn matches(&self, reading: DutyCycleReading, threshold: f64) -> bool {
        match reading {
            DutyCycleReading::Off => match self {
                Self::Equal => threshold == 0.0,
                Self::Below => threshold != 0.0,
                Self::Above => false,
            },
            DutyCycleReading::Percent(duty) => self.operator().evaluate(duty, threshold),
        }
    }
}

/// Rule condition, tagged by trigger class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum TriggerCondition {
    TriggerOutput {
        output_state: OnOffCondition,
        #[serde(default)]
        output_duration: f64,
    },
    TriggerOutputPwm {
        output_state: DutyCycleCondition,
        #[serde(default)]
        output_duty_cycle: f64,
    },
}

impl TriggerCondition {
    pub fn class(&self) -> TriggerClass {
        match self {
            Self::TriggerOutput { .. } => TriggerClass::Output,
            Self::TriggerOutputPwm { .. } => TriggerClass::OutputPwm,
        }
    }

    pub fn state_str(&self) -> &'static str {
        match self {
            Self::TriggerOutput { output_state, .. } => output_state.as_str(),
            Self::TriggerOutputPwm { output_state, .. } => output_state.as_str(),
        }
    }

    /// Duration or duty-cycle threshold
    pub fn threshold(&self) -> f64 {
        match self {
            Self::TriggerOutput {
                output_duration, ..
            } => *output_duration,
            Self::TriggerOutputPwm {
                output_duty_cycle, ..
            } => *output_duty_cycle,
        }
    }
}

/// A persisted condition bound to an output that dispatches actions when matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub id: String,
    pub name: String,
    pub output_id: OutputId,
    #[serde(default = "default_activated")]
    pub is_activated: bool,
    #[serde(flatten)]
    pub condition: TriggerCondition,
}

fn default_activated() -> bool {
    true
}

impl TriggerRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        output_id: OutputId,
        condition: TriggerCondition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            output_id,
            is_activated: true,
            condition,
        }
    }

    pub fn class(&self) -> TriggerClass {
        self.condition.class()
    }

    /// First segment of a hyphenated rule id
    pub fn short_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }
}
