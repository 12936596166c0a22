//! Declarative reconciliation of New Relic synthetics monitors and alert conditions.
//!
//! Each resource kind implements [`Reconciler`], translating create, read, update, delete
//! and exists hooks into calls on a [`synthetics::Client`].

use config::SyntheticsOpts;
use eyre::{Result, WrapErr};
use std::time::Duration;
use synthetics::{Client, ClientConfig, HttpExecutor};

/// Alert condition reconciler
pub mod alert_condition;
pub use alert_condition::{
    AlertConditionData, AlertConditionField, AlertConditionRecord, AlertConditionResource,
};

mod error;
pub use error::ReconcileError;

/// Monitor reconciler
pub mod monitor;
pub use monitor::{MonitorData, MonitorField, MonitorRecord, MonitorResource, fingerprint};

/// Resource data and lifecycle hooks
pub mod resource;
pub use resource::{Reconciler, ResourceData};

/// Build a synthetics client from command line or environment options.
pub fn configure(opts: &SyntheticsOpts) -> Result<Client> {
    let config = ClientConfig {
        api_key: opts.api_key.clone(),
        base_url: opts.synthetics_url.to_string(),
        alerts_base_url: opts.alerts_url.to_string(),
        max_attempts: opts.max_attempts,
        backoff_unit: Duration::from_millis(opts.backoff_unit_ms),
    };
    Client::new(config).wrap_err("could not instantiate synthetics client")
}

/// The reconcilers of every supported resource kind, sharing one client.
#[derive(Debug, Clone)]
pub struct Provider<E = reqwest::Client> {
    /// Monitor reconciler
    pub monitors: MonitorResource<E>,
    /// Alert condition reconciler
    pub alert_conditions: AlertConditionResource<E>,
}

impl<E: HttpExecutor + Clone> Provider<E> {
    /// Create the reconcilers around `client`.
    pub fn new(client: Client<E>) -> Self {
        Self {
            monitors: MonitorResource::new(client.clone()),
            alert_conditions: AlertConditionResource::new(client),
        }
    }
}

impl Provider {
    /// Configure a provider from options.
    pub fn from_opts(opts: &SyntheticsOpts) -> Result<Self> {
        configure(opts).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(api_key: &str) -> SyntheticsOpts {
        SyntheticsOpts {
            api_key: api_key.to_owned(),
            synthetics_url: "https://synthetics.newrelic.com/synthetics/api/v3".parse().unwrap(),
            alerts_url: "https://api.newrelic.com/v2".parse().unwrap(),
            max_attempts: 3,
            backoff_unit_ms: 1000,
        }
    }

    #[test]
    fn configure_requires_api_key() {
        let err = configure(&opts("")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<synthetics::Error>(),
            Some(synthetics::Error::MissingCredential)
        ));
    }

    #[test]
    fn provider_from_opts() {
        let provider = Provider::from_opts(&opts("test-api-key")).unwrap();
        assert!(!format!("{provider:?}").contains("test-api-key"));
    }
}
