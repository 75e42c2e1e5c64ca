//! Resource clients, one per API collection.
//!
//! Each client comes in an async flavour and, with the `blocking` feature, a
//! blocking one. Both send the same requests and dispatch statuses the same
//! way; only the I/O model differs.

mod models;
mod results;

pub use models::AsyncModelsClient;
pub use results::AsyncResultsClient;

#[cfg(feature = "blocking")]
pub use models::ModelsClient;
#[cfg(feature = "blocking")]
pub use results::{ResultDownload, ResultsClient};

/// Path segment of the models collection.
const MODELS: &str = "models";

/// Path segment of the model results collection.
const MODEL_RESULTS: &str = "model-results";
