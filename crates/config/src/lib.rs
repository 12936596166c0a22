//! Synthetics provider configuration
use clap::Parser;
use derive_more::Debug;
use url::Url;

/// New Relic API configuration options
#[derive(Debug, Clone, Parser)]
pub struct SyntheticsOpts {
    /// New Relic admin API key
    #[clap(long, env = "NEW_RELIC_API_KEY", hide_env_values = true)]
    #[debug(skip)]
    pub api_key: String,
    /// Synthetics monitor API base URL
    #[clap(
        long,
        env = "NEW_RELIC_SYNTHETICS_URL",
        default_value = "https://synthetics.newrelic.com/synthetics/api/v3"
    )]
    pub synthetics_url: Url,
    /// Alerts API base URL
    #[clap(long, env = "NEW_RELIC_ALERTS_URL", default_value = "https://api.newrelic.com/v2")]
    pub alerts_url: Url,
    /// Attempts per request while rate limited
    #[clap(
        long,
        env = "NEW_RELIC_MAX_ATTEMPTS",
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,
    /// Backoff unit in milliseconds; the n-th retry waits 2^n units
    #[clap(long, env = "NEW_RELIC_BACKOFF_UNIT_MS", default_value = "1000")]
    pub backoff_unit_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::SyntheticsOpts;
    use clap::Parser;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        SyntheticsOpts::command().debug_assert()
    }

    #[test]
    fn test_defaults() {
        let opts =
            SyntheticsOpts::try_parse_from(["provider", "--api-key", "secret-key"]).unwrap();
        assert_eq!(opts.api_key, "secret-key");
        assert_eq!(opts.synthetics_url.host_str(), Some("synthetics.newrelic.com"));
        assert_eq!(opts.alerts_url.as_str(), "https://api.newrelic.com/v2");
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(opts.backoff_unit_ms, 1000);
        assert!(!format!("{opts:?}").contains("secret-key"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let res = SyntheticsOpts::try_parse_from([
            "provider",
            "--api-key",
            "secret-key",
            "--max-attempts",
            "0",
        ]);
        assert!(res.is_err());
    }
}
