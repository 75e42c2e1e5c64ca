//! Client configuration.

use crate::credential::Credential;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key for [`ClientConfig::from_env`].
pub const API_KEY_ENV: &str = "CONDUCTOR_QUANTUM_API_KEY";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// SDK name sent in the identification headers.
pub const SDK_NAME: &str = "conductorquantum";

/// SDK version sent in the identification headers.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) const USER_AGENT: &str = concat!("conductorquantum-rust/", env!("CARGO_PKG_VERSION"));

/// Hosted API environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Production API.
    #[default]
    Default,
}

impl Environment {
    /// Base URL of the environment.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Default => "https://api.conductorquantum.com/v0",
        }
    }
}

/// Configuration shared by every request a client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit base URL; takes precedence over `environment`.
    pub base_url: Option<String>,
    /// Environment used when no base URL is set.
    pub environment: Environment,
    /// Token source, resolved on every request.
    pub credential: Option<Credential>,
    /// Per-request timeout. `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// Whether redirects are followed.
    pub follow_redirects: bool,
    /// Directory for temporary upload files; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    /// Pre-built async HTTP client. Its own timeout and redirect settings
    /// apply instead of the ones above.
    pub http_client: Option<reqwest::Client>,
    /// Pre-built blocking HTTP client, same rules as `http_client`.
    #[cfg(feature = "blocking")]
    pub blocking_http_client: Option<reqwest::blocking::Client>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            environment: Environment::Default,
            credential: None,
            timeout: Some(DEFAULT_TIMEOUT),
            follow_redirects: true,
            temp_dir: None,
            http_client: None,
            #[cfg(feature = "blocking")]
            blocking_http_client: None,
        }
    }
}

impl ClientConfig {
    /// Configuration with the given credential and default settings.
    #[must_use]
    pub fn new(credential: impl Into<Credential>) -> Self {
        Self::default().with_credential(credential)
    }

    /// Configuration reading the token from [`API_KEY_ENV`] on every request.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_credential(Credential::env(API_KEY_ENV))
    }

    /// Set the credential.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<Credential>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Select a hosted environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Enable or disable following redirects.
    #[must_use]
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Stage temporary upload files under `dir`.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Use a pre-built async HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use a pre-built blocking HTTP client.
    #[cfg(feature = "blocking")]
    #[must_use]
    pub fn with_blocking_http_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.blocking_http_client = Some(client);
        self
    }

    /// Base URL requests are sent to, without a trailing slash.
    #[must_use]
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Timeout for this call only.
    pub timeout: Option<Duration>,
    /// Extra headers; they replace SDK headers of the same name.
    pub additional_headers: Vec<(String, String)>,
    /// Extra query parameters, appended after the operation's own.
    pub additional_query_parameters: Vec<(String, String)>,
}

impl RequestOptions {
    /// Empty overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_query_parameters
            .push((name.into(), value.into()));
        self
    }
}
