//! Client for the New Relic Synthetics monitor API and the synthetics alert condition
//! API.
//!
//! Every request is authenticated with an admin API key and retried with exponential
//! backoff while the service answers `429 Too Many Requests`.

/// API client and its configuration
pub mod client;
pub use client::{Client, ClientConfig, DEFAULT_ALERTS_URL, DEFAULT_SYNTHETICS_URL};

/// Error types
pub mod error;
pub use error::{Error, Result, TransportError};

/// Wire types
pub mod models;
pub use models::*;

/// Type-conditional monitor options
pub mod options;
pub use options::{ConditionalField, MonitorOptions, encode_options};

/// Request execution and rate-limit retries
pub mod transport;
pub use transport::{HttpExecutor, RetryingTransport};
