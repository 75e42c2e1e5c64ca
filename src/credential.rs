//! Credential resolution.
//!
//! A [`Credential`] is resolved into an `Authorization: Bearer <token>`
//! header on every request. Nothing is cached between requests, so a
//! provider can rotate tokens without the client being rebuilt.

use crate::error::CredentialError;
use reqwest::header::HeaderValue;
use std::env::{self, VarError};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied function returning the current token.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Source of the API token.
#[derive(Clone)]
pub enum Credential {
    /// Fixed token.
    Static(String),
    /// Environment variable read at request time.
    Env(String),
    /// Function called at request time.
    Provider(TokenProvider),
}

impl Credential {
    /// Fixed token.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Token read from the environment variable `name` on every request.
    #[must_use]
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env(name.into())
    }

    /// Token produced by `provider` on every request.
    #[must_use]
    pub fn provider<F>(provider: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self::Provider(Arc::new(provider))
    }

    /// Resolve to a non-empty token.
    pub fn resolve(&self) -> Result<String, CredentialError> {
        let token = match self {
            Self::Static(token) => token.clone(),
            Self::Env(name) => match env::var(name) {
                Ok(token) => token,
                Err(VarError::NotPresent) => return Err(CredentialError::NotProvided),
                Err(VarError::NotUnicode(_)) => return Err(CredentialError::NotAString),
            },
            Self::Provider(provider) => provider().ok_or(CredentialError::NotProvided)?,
        };

        if token.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Credential::Static(<redacted>)"),
            Self::Env(name) => write!(f, "Credential::Env({name:?})"),
            Self::Provider(_) => f.write_str("Credential::Provider(..)"),
        }
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::token(token)
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::Static(token)
    }
}

/// Build the `Authorization` header value for `credential`.
///
/// A missing credential is reported the same way as a provider that returns
/// nothing.
pub fn authorization_header(
    credential: Option<&Credential>,
) -> Result<HeaderValue, CredentialError> {
    let token = credential.ok_or(CredentialError::NotProvided)?.resolve()?;
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| CredentialError::InvalidHeaderValue)?;
    value.set_sensitive(true);
    Ok(value)
}
