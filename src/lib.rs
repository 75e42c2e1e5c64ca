// Clippy configuration for conductorquantum crate
// Allow truncating casts in binary header encoding (lengths are bounds-checked)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
// Allow long literals (byte sequences, magic numbers)
#![allow(clippy::unreadable_literal)]
// Allow redundant closures for clarity
#![allow(clippy::redundant_closure_for_method_calls)]
// Allow format string style choices
#![allow(clippy::uninlined_format_args)]
// Doc backticks optional
#![allow(clippy::doc_markdown)]
// Allow missing docs for internal items
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Allow identical match arms for clarity
#![allow(clippy::match_same_arms)]
// Allow pass-by-value for small types
#![allow(clippy::needless_pass_by_value)]
// Allow map_or simplification choices
#![allow(clippy::unnecessary_map_or)]

//! Conductor Quantum: Model Catalogue and Execution Client
//!
//! Client for the Conductor Quantum HTTP API, which hosts machine learning
//! models for quantum device tuning. It covers listing and inspecting the
//! model catalogue, running a model on measurement data, and retrieving,
//! downloading and deleting the stored results.
//!
//! # Quick Start
//!
//! ```no_run
//! use conductorquantum::prelude::*;
//! use ndarray::Array2;
//!
//! let client = ConductorQuantum::from_env()?;
//!
//! // Browse the catalogue
//! for model in client.models().list(ListParams::new().limit(10))? {
//!     println!("{}: {}", model.id, model.name);
//! }
//!
//! // Run a model on an in-memory array
//! let sweep = Array2::<f64>::zeros((64, 64));
//! let result = client
//!     .models()
//!     .execute(ExecuteRequest::new("coulomb-blockade-classifier-v2", &sweep))?;
//! println!("{:?}", result.output);
//!
//! // Clean up
//! client.results().delete(result.id)?;
//! # Ok::<(), conductorquantum::Error>(())
//! ```
//!
//! # Clients
//!
//! - [`AsyncConductorQuantum`] - async client on `tokio`
//! - [`ConductorQuantum`] - blocking client (`blocking` feature, on by default)
//!
//! Both expose `models()` and `results()` with the same operations. The
//! token is resolved from the configured [`Credential`] on every request
//! and a missing or empty token fails before anything is sent.
//!
//! # Errors
//!
//! HTTP 403, 404 and 422 map to [`Error::Forbidden`], [`Error::NotFound`]
//! and [`Error::ValidationFailed`]; every other failure status becomes
//! [`Error::Api`] with the raw body. Nothing is retried.
//!
//! # Logging
//!
//! Requests and responses are reported as `tracing` events at `debug`
//! level. The crate never installs a subscriber.

pub mod archive;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod npy;
pub mod prelude;
pub mod resources;
mod transport;
pub mod types;
pub mod upload;

pub use client::AsyncConductorQuantum;
#[cfg(feature = "blocking")]
pub use client::ConductorQuantum;
pub use config::{ClientConfig, Environment, RequestOptions};
pub use credential::Credential;
pub use error::{Error, Result};
