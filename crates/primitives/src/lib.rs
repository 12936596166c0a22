//! Core primitives shared by the synthetics crates.
/// Backoff schedules for rate-limited requests
pub mod retries;
