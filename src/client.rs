//! Client entry points.

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::Result;
use crate::resources::{AsyncModelsClient, AsyncResultsClient};
use crate::transport::AsyncTransport;

/// Async Conductor Quantum client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct AsyncConductorQuantum {
    transport: AsyncTransport,
}

impl AsyncConductorQuantum {
    /// Build a client from `config`.
    ///
    /// Fails only if the base URL is unusable or the HTTP client cannot be
    /// built. The credential is checked per request.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: AsyncTransport::new(&config)?,
        })
    }

    /// Client for the production API using a fixed token.
    pub fn with_token(token: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(Credential::token(token)))
    }

    /// Client reading its token from `CONDUCTOR_QUANTUM_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Model catalogue and execution.
    #[must_use]
    pub fn models(&self) -> AsyncModelsClient {
        AsyncModelsClient::new(self.transport.clone())
    }

    /// Stored execution results.
    #[must_use]
    pub fn results(&self) -> AsyncResultsClient {
        AsyncResultsClient::new(self.transport.clone())
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.transport.endpoint().base_url()
    }
}

#[cfg(feature = "blocking")]
pub use blocking::ConductorQuantum;

#[cfg(feature = "blocking")]
mod blocking {
    use crate::config::ClientConfig;
    use crate::credential::Credential;
    use crate::error::Result;
    use crate::resources::{ModelsClient, ResultsClient};
    use crate::transport::BlockingTransport;

    /// Blocking Conductor Quantum client.
    ///
    /// Must not be created or dropped inside an async runtime; use
    /// [`AsyncConductorQuantum`](crate::AsyncConductorQuantum) there.
    #[derive(Debug, Clone)]
    pub struct ConductorQuantum {
        transport: BlockingTransport,
    }

    impl ConductorQuantum {
        /// Build a client from `config`.
        pub fn new(config: ClientConfig) -> Result<Self> {
            Ok(Self {
                transport: BlockingTransport::new(&config)?,
            })
        }

        /// Client for the production API using a fixed token.
        pub fn with_token(token: impl Into<String>) -> Result<Self> {
            Self::new(ClientConfig::new(Credential::token(token)))
        }

        /// Client reading its token from `CONDUCTOR_QUANTUM_API_KEY`.
        pub fn from_env() -> Result<Self> {
            Self::new(ClientConfig::from_env())
        }

        /// Model catalogue and execution.
        #[must_use]
        pub fn models(&self) -> ModelsClient {
            ModelsClient::new(self.transport.clone())
        }

        /// Stored execution results.
        #[must_use]
        pub fn results(&self) -> ResultsClient {
            ResultsClient::new(self.transport.clone())
        }

        /// Base URL requests are sent to.
        #[must_use]
        pub fn base_url(&self) -> &str {
            self.transport.endpoint().base_url()
        }
    }
}
