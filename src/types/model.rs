//! Model catalogue entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A model offered by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, e.g. `coulomb-blockade-peak-detector-v1`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the model is publicly released.
    #[serde(default)]
    pub released: bool,
    /// How many times the model has been executed.
    #[serde(default)]
    pub number_of_runs: u64,
    /// Description of the input array the model expects.
    #[serde(default)]
    pub input_shape_requirements: Value,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
