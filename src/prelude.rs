//! Convenient re-exports for common usage.
//!
//! ```
//! use conductorquantum::prelude::*;
//! ```

// Core types
pub use crate::config::{ClientConfig, Environment, RequestOptions};
pub use crate::credential::Credential;
pub use crate::error::{ApiBody, CredentialError, Error, Result};

// Clients
pub use crate::client::AsyncConductorQuantum;
#[cfg(feature = "blocking")]
pub use crate::client::ConductorQuantum;
pub use crate::resources::{AsyncModelsClient, AsyncResultsClient};
#[cfg(feature = "blocking")]
pub use crate::resources::{ModelsClient, ResultDownload, ResultsClient};

// API types
pub use crate::types::{
    HttpValidationError, ListParams, ModelInfo, ModelResultInfo, ModelResultMasked, ResultId,
};

// Upload types
pub use crate::npy::NpyArray;
pub use crate::upload::{ExecuteData, ExecuteRequest};
