//! Field-level validation errors returned with HTTP 422.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a 422 response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpValidationError {
    /// Individual field errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<ValidationError>>,
}

impl HttpValidationError {
    /// Field errors, empty when the server sent none.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        self.detail.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for HttpValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors();
        if errors.is_empty() {
            return f.write_str("no details");
        }
        for (i, err) in errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Path to the offending field, e.g. `["body", "file"]`.
    pub loc: Vec<LocItem>,
    /// Error message.
    pub msg: String,
    /// Error type, e.g. `missing`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.loc.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}", path.join("."), self.msg)
    }
}

/// Segment of a validation error location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocItem {
    /// Field name.
    Field(String),
    /// Array index.
    Index(i64),
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}
