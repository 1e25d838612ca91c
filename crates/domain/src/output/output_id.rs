use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

const MAX_LEN: usize = 100;

/// Identifier of an output.
///
/// Shows up in command payloads, rule bindings and measurement rows, so it is
/// limited to letters, digits, `_` and `-`. MQTT wildcards, path separators
/// and whitespace never pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputId(String);

impl OutputId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() || id.len() > MAX_LEN {
            return Err(DomainError::InvalidOutputId(format!(
                "output id must be 1..={MAX_LEN} characters, got {}",
                id.len()
            )));
        }

        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(DomainError::InvalidOutputId(format!(
                "output id {id:?} contains {bad:?}"
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OutputId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OutputId> for String {
    fn from(id: OutputId) -> Self {
        id.0
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
