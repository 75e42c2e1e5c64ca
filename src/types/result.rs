//! Model execution results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a model result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(Uuid);

impl ResultId {
    /// Create from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ResultId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for ResultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ResultId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Full result of a model execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResultInfo {
    /// Result identifier.
    pub id: ResultId,
    /// Identifier of the model that produced this result.
    pub model: String,
    /// Model output, keyed by output name.
    #[serde(default)]
    pub output: Map<String, Value>,
    /// UTC time the result was created.
    pub created_at: DateTime<Utc>,
    /// Name of the uploaded input file.
    pub input_file_name: String,
    /// Size of the uploaded input file in bytes.
    pub input_file_size: u64,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelResultInfo {
    /// Whether every key in `keys` is present in the output.
    #[must_use]
    pub fn has_output_keys(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.output.contains_key(*k))
    }

    /// List-view form of this result, without the input file fields.
    #[must_use]
    pub fn masked(&self) -> ModelResultMasked {
        ModelResultMasked {
            id: self.id,
            model: self.model.clone(),
            created_at: self.created_at,
            output: self.output.clone(),
            extra: Map::new(),
        }
    }
}

/// Result as returned by list endpoints, with the input file fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResultMasked {
    /// Result identifier.
    pub id: ResultId,
    /// Identifier of the model that produced this result.
    pub model: String,
    /// UTC time the result was created.
    pub created_at: DateTime<Utc>,
    /// Model output, keyed by output name.
    #[serde(default)]
    pub output: Map<String, Value>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
