//! Error types for Conductor Quantum API calls.

use crate::types::HttpValidationError;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a credential could not be turned into an `Authorization` header.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// No token configured, the environment variable is unset, or the
    /// provider returned nothing.
    #[error("Token is required but was not provided")]
    NotProvided,

    /// The token resolved to an empty string.
    #[error("Token is required but was empty")]
    Empty,

    /// The token resolved to something that is not text.
    #[error("Token must be a string")]
    NotAString,

    /// The token contains bytes that cannot appear in an HTTP header.
    #[error("Token contains characters that are not allowed in an HTTP header")]
    InvalidHeaderValue,
}

/// Raw body of an unexpected API response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    /// Body parsed as JSON.
    Json(Value),
    /// Body that was not valid JSON, kept as text.
    Text(String),
}

impl ApiBody {
    /// Keep the body as JSON when it parses, as text otherwise.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::text(bytes),
        }
    }

    pub(crate) fn text(bytes: &[u8]) -> Self {
        Self::Text(String::from_utf8_lossy(bytes).into_owned())
    }

    /// JSON value, if the body parsed.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ApiBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Errors that can occur while talking to the API.
#[derive(Error, Debug)]
pub enum Error {
    /// The credential failed validation before any request was sent.
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] CredentialError),

    /// HTTP 403.
    #[error("forbidden (HTTP 403){}", describe(.body))]
    Forbidden {
        /// Server-supplied body, `None` when empty or `null`.
        body: Option<Value>,
    },

    /// HTTP 404.
    #[error("not found (HTTP 404){}", describe(.body))]
    NotFound {
        /// Server-supplied body, `None` when empty or `null`.
        body: Option<Value>,
    },

    /// HTTP 422 with field-level details.
    #[error("validation failed (HTTP 422): {0}")]
    ValidationFailed(HttpValidationError),

    /// Any other non-2xx status, or a body that could not be decoded.
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: ApiBody,
    },

    /// Connection, timeout or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file operation failed while preparing an upload.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Array data does not match its declared shape.
    #[error("invalid array: {0}")]
    InvalidArray(String),

    /// Downloaded archive could not be parsed.
    #[error("invalid archive: {0}")]
    Archive(String),

    /// Client configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status code carried by this error, if it came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::ValidationFailed(_) => Some(422),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this is a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn describe(body: &Option<Value>) -> String {
    match body {
        Some(Value::Object(map)) if map.len() == 1 && map.contains_key("detail") => {
            match &map["detail"] {
                Value::String(detail) => format!(": {detail}"),
                other => format!(": {other}"),
            }
        }
        Some(value) => format!(": {value}"),
        None => String::new(),
    }
}
