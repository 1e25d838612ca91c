use serde::{Deserialize, Serialize};

/// Comparison applied between an observed value and a rule threshold
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Operator {
    /// `observed <op> threshold`
    pub fn evaluate<T: PartialOrd>(self, observed: T, threshold: T) -> bool {
        match self {
            Self::Equal => observed == threshold,
            Self::NotEqual => observed != threshold,
            Self::Less => observed < threshold,
            Self::LessOrEqual => observed <= threshold,
            Self::Greater => observed > threshold,
            Self::GreaterOrEqual => observed >= threshold,
        }
    }
}
