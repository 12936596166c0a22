//! Client for the synthetics monitor and alerts REST APIs.

use std::time::{Duration, Instant};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use derive_more::Debug;
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode, header};
use primitives::retries::{DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};
use regex::Regex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error};
use url::Url;

use crate::{
    error::{Error, Result},
    models::{
        AlertCondition, ConditionEnvelope, ConditionListEnvelope, CreateAlertConditionArgs,
        CreateMonitorArgs, ExtendedMonitor, GetAllMonitorsArgs, GetAllMonitorsResponse, Monitor,
        MonitorStatus, MonitorType, RawGetAllMonitorsResponse, ScriptLocation,
        UpdateAlertConditionArgs, UpdateMonitorArgs, UpdateMonitorScriptArgs,
    },
    options::{ConditionalField, MonitorOptions, encode_options},
    transport::{HttpExecutor, RetryingTransport},
};


/// Default base URL of the synthetics monitor API.
pub const DEFAULT_SYNTHETICS_URL: &str = "https://synthetics.newrelic.com/synthetics/api/v3";

/// Default base URL of the alerts API.
pub const DEFAULT_ALERTS_URL: &str = "https://api.newrelic.com/v2";

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Settings for [`Client`]. Validated once by [`Client::with_executor`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Admin API key sent as `X-Api-Key`
    #[debug(skip)]
    pub api_key: String,
    /// Base URL of the synthetics monitor API
    pub base_url: String,
    /// Base URL of the alerts API
    pub alerts_base_url: String,
    /// Attempts per request while rate limited, at least one
    pub max_attempts: u32,
    /// Backoff unit; the n-th retry waits `2^n` units
    pub backoff_unit: Duration,
}

impl ClientConfig {
    /// Configuration for the public endpoints with default retry settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_SYNTHETICS_URL.to_owned(),
            alerts_base_url: DEFAULT_ALERTS_URL.to_owned(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

/// Client for the synthetics and alerts APIs.
///
/// Every request is authenticated and goes through a [`RetryingTransport`]. The client
/// holds no lock, so one instance can be cloned or shared across tasks freely.
#[derive(Debug, Clone)]
pub struct Client<E = reqwest::Client> {
    transport: RetryingTransport<E>,
    api_key: HeaderValue,
    base_url: String,
    alerts_base_url: String,
    location_pattern: Regex,
}

impl Client {
    /// Create a client backed by a fresh [`reqwest::Client`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_executor(config, reqwest::Client::new())
    }
}

impl<E: HttpExecutor> Client<E> {
    /// Create a client that performs requests through `executor`.
    pub fn with_executor(config: ClientConfig, executor: E) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingCredential);
        }
        if config.max_attempts == 0 {
            return Err(Error::InvalidArgument("max_attempts must be at least 1".to_owned()));
        }

        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            Error::InvalidArgument("api key is not a valid header value".to_owned())
        })?;
        api_key.set_sensitive(true);

        let base_url = normalize_base(&config.base_url)?;
        let alerts_base_url = normalize_base(&config.alerts_base_url)?;
        let location_pattern =
            Regex::new(&format!("^{}/monitors/([^/]+)$", regex::escape(&base_url)))
                .map_err(|e| Error::InvalidArgument(format!("invalid base url: {e}")))?;

        Ok(Self {
            transport: RetryingTransport::new(executor, config.max_attempts, config.backoff_unit),
            api_key,
            base_url,
            alerts_base_url,
            location_pattern,
        })
    }

    /// List monitors, one page at a time.
    pub async fn get_all_monitors(&self, args: GetAllMonitorsArgs) -> Result<GetAllMonitorsResponse> {
        const OP: &str = "GetAllMonitors";

        let mut query = Vec::new();
        if args.offset > 0 {
            query.push(format!("offset={}", args.offset));
        }
        if args.limit > 0 {
            query.push(format!("limit={}", args.limit));
        }
        let mut url = format!("{}/monitors", self.base_url);
        if !query.is_empty() {
            url = format!("{url}?{}", query.join("&"));
        }

        let response = self.send(OP, Method::GET, &url, Bytes::new()).await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(OP, &response));
        }

        let raw: RawGetAllMonitorsResponse = decode(OP, &response)?;
        let monitors =
            raw.monitors.into_iter().map(ExtendedMonitor::try_from).collect::<Result<Vec<_>>>()?;
        Ok(GetAllMonitorsResponse { monitors, count: raw.count })
    }

    /// Fetch a single monitor.
    pub async fn get_monitor(&self, id: &str) -> Result<Monitor> {
        const OP: &str = "GetMonitor";
        require_id(id)?;

        let response = self.send(OP, Method::GET, &self.monitor_url(id), Bytes::new()).await?;
        match response.status() {
            StatusCode::OK => decode(OP, &response),
            StatusCode::NOT_FOUND => Err(Error::MonitorNotFound { id: id.to_owned() }),
            _ => Err(unexpected(OP, &response)),
        }
    }

    /// Create a monitor and return the stored record.
    ///
    /// Options and `uri` are dropped when `args.monitor_type` does not accept them.
    pub async fn create_monitor(&self, args: &CreateMonitorArgs) -> Result<Monitor> {
        const OP: &str = "CreateMonitor";

        let payload = CreateMonitorPayload {
            name: &args.name,
            monitor_type: args.monitor_type,
            frequency: args.frequency,
            uri: args.uri.as_deref().filter(|_| args.monitor_type.accepts(ConditionalField::Uri)),
            locations: &args.locations,
            status: args.status,
            sla_threshold: args.sla_threshold,
            options: encode_options(args.monitor_type, &args.options),
        };
        let body = encode(OP, &payload)?;

        let url = format!("{}/monitors", self.base_url);
        let response = self.send(OP, Method::POST, &url, body).await?;
        if response.status() != StatusCode::CREATED {
            return Err(unexpected(OP, &response));
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let id = self.monitor_id_from_location(location)?;
        debug!(op = OP, id, "monitor created");

        self.get_monitor(&id).await
    }

    /// Apply a partial update and return the stored record.
    pub async fn update_monitor(&self, id: &str, args: &UpdateMonitorArgs) -> Result<Monitor> {
        const OP: &str = "UpdateMonitor";
        require_id(id)?;

        let body = encode(OP, args)?;
        let response = self.send(OP, Method::PATCH, &self.monitor_url(id), body).await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(unexpected(OP, &response));
        }

        self.get_monitor(id).await
    }

    /// Delete a monitor. A missing monitor is reported as an unexpected status.
    pub async fn delete_monitor(&self, id: &str) -> Result<()> {
        const OP: &str = "DeleteMonitor";
        require_id(id)?;

        let response = self.send(OP, Method::DELETE, &self.monitor_url(id), Bytes::new()).await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(unexpected(OP, &response));
        }
        Ok(())
    }

    /// Replace the script of a scripted monitor.
    pub async fn update_monitor_script(&self, id: &str, args: &UpdateMonitorScriptArgs) -> Result<()> {
        const OP: &str = "UpdateMonitorScript";
        require_id(id)?;
        if args.script_text.is_empty() {
            return Err(Error::InvalidArgument("script text must not be empty".to_owned()));
        }

        let payload = ScriptPayload {
            script_text: STANDARD.encode(&args.script_text),
            script_locations: (!args.script_locations.is_empty())
                .then_some(args.script_locations.as_slice()),
        };
        let body = encode(OP, &payload)?;

        let response = self.send(OP, Method::PUT, &self.script_url(id), body).await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(unexpected(OP, &response));
        }
        Ok(())
    }

    /// Fetch the decoded script text of a monitor.
    pub async fn get_monitor_script(&self, id: &str) -> Result<String> {
        const OP: &str = "GetMonitorScript";
        require_id(id)?;

        let response = self.send(OP, Method::GET, &self.script_url(id), Bytes::new()).await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(Error::ScriptNotFound { id: id.to_owned() }),
            _ => return Err(unexpected(OP, &response)),
        }

        let script: ScriptResponse = decode(OP, &response)?;
        let raw = STANDARD.decode(script.script_text).map_err(|e| Error::decode(OP, e))?;
        String::from_utf8(raw).map_err(|e| Error::decode(OP, e))
    }

    /// Create an alert condition in `policy_id`.
    pub async fn create_alert_condition(
        &self,
        policy_id: u64,
        args: &CreateAlertConditionArgs,
    ) -> Result<AlertCondition> {
        const OP: &str = "CreateAlertCondition";

        let url =
            format!("{}/alerts_synthetics_conditions/policies/{policy_id}.json", self.alerts_base_url);
        let body = encode(OP, &ConditionEnvelope { synthetics_condition: args })?;
        let response = self.send(OP, Method::POST, &url, body).await?;
        if !response.status().is_success() {
            return Err(unexpected(OP, &response));
        }

        let envelope: ConditionEnvelope<AlertCondition> = decode(OP, &response)?;
        Ok(envelope.synthetics_condition)
    }

    /// Fetch alert condition `id` of `policy_id`.
    pub async fn get_alert_condition(&self, policy_id: u64, id: u64) -> Result<AlertCondition> {
        const OP: &str = "GetAlertCondition";

        let url =
            format!("{}/alerts_synthetics_conditions.json?policy_id={policy_id}", self.alerts_base_url);
        let response = self.send(OP, Method::GET, &url, Bytes::new()).await?;
        let not_found = || Error::AlertConditionNotFound { policy_id: Some(policy_id), id };
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        if !response.status().is_success() {
            return Err(unexpected(OP, &response));
        }

        let list: ConditionListEnvelope = decode(OP, &response)?;
        list.synthetics_conditions.into_iter().find(|c| c.id == id).ok_or_else(not_found)
    }

    /// Replace alert condition `id` of `policy_id`.
    pub async fn update_alert_condition(
        &self,
        policy_id: u64,
        id: u64,
        args: &UpdateAlertConditionArgs,
    ) -> Result<AlertCondition> {
        const OP: &str = "UpdateAlertCondition";

        let body = encode(OP, &ConditionEnvelope { synthetics_condition: args })?;
        let response = self.send(OP, Method::PUT, &self.condition_url(id), body).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::AlertConditionNotFound { policy_id: Some(policy_id), id });
        }
        if !response.status().is_success() {
            return Err(unexpected(OP, &response));
        }

        let envelope: ConditionEnvelope<AlertCondition> = decode(OP, &response)?;
        Ok(envelope.synthetics_condition)
    }

    /// Delete alert condition `id`.
    pub async fn delete_alert_condition(&self, id: u64) -> Result<()> {
        const OP: &str = "DeleteAlertCondition";

        let response = self.send(OP, Method::DELETE, &self.condition_url(id), Bytes::new()).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::AlertConditionNotFound { policy_id: None, id });
        }
        if !response.status().is_success() {
            return Err(unexpected(OP, &response));
        }
        Ok(())
    }

    fn monitor_url(&self, id: &str) -> String {
        format!("{}/monitors/{id}", self.base_url)
    }

    fn script_url(&self, id: &str) -> String {
        format!("{}/monitors/{id}/script", self.base_url)
    }

    fn condition_url(&self, id: u64) -> String {
        format!("{}/alerts_synthetics_conditions/{id}.json", self.alerts_base_url)
    }

    fn monitor_id_from_location(&self, location: &str) -> Result<String> {
        self.location_pattern
            .captures(location)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_owned())
            .ok_or_else(|| Error::IdExtraction { location: location.to_owned() })
    }

    /// Build an authenticated request and run it through the transport.
    async fn send(
        &self,
        op: &'static str,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<Response<Bytes>> {
        let mut request = Request::new(body);
        *request.uri_mut() = url
            .parse::<http::Uri>()
            .map_err(|e| Error::InvalidArgument(format!("invalid request url {url:?}: {e}")))?;
        *request.method_mut() = method.clone();
        let headers = request.headers_mut();
        headers.insert(API_KEY_HEADER, self.api_key.clone());
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let start = Instant::now();
        let result = self.transport.execute(request).await;
        let duration_ms = start.elapsed().as_millis();
        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(op, %method, url, status, duration_ms, "synthetics request executed");
                Ok(response)
            }
            Err(source) => {
                error!(op, %method, url, duration_ms, error = %source, "synthetics request failed");
                Err(Error::Transport { op, source })
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMonitorPayload<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    monitor_type: MonitorType,
    frequency: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    locations: &'a [String],
    status: MonitorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    sla_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<MonitorOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptPayload<'a> {
    script_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_locations: Option<&'a [ScriptLocation]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptResponse {
    script_text: String,
}

/// Parse a configured base URL and strip its trailing slash.
fn normalize_base(raw: &str) -> Result<String> {
    let url =
        Url::parse(raw).map_err(|e| Error::InvalidArgument(format!("invalid base url {raw:?}: {e}")))?;
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

fn require_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidArgument("monitor id must not be empty".to_owned()));
    }
    Ok(())
}

fn encode<T: Serialize + ?Sized>(op: &'static str, value: &T) -> Result<Bytes> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|source| Error::Encode { op, source })
}

fn decode<T: DeserializeOwned>(op: &'static str, response: &Response<Bytes>) -> Result<T> {
    serde_json::from_slice(response.body()).map_err(|e| Error::decode(op, e))
}

fn unexpected(op: &'static str, response: &Response<Bytes>) -> Error {
    Error::UnexpectedStatus {
        op,
        status: response.status().as_u16(),
        body: String::from_utf8_lossy(response.body()).into_owned(),
    }
}
