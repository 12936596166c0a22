//! Wire types of the synthetics and alerts APIs.

use chrono::{DateTime, FixedOffset};
use derive_more::Debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    options::MonitorOptions,
};

/// Timestamp format used by the monitor list endpoint, e.g. `2016-06-06T22:19:06.155+0000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Check frequencies (in minutes) accepted by the service.
pub const ALLOWED_FREQUENCIES: [u32; 9] = [1, 5, 10, 15, 30, 60, 360, 720, 1440];

/// Kind of synthetic check.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorType {
    /// Ping a URL.
    Simple,
    /// Load a URL in a browser.
    Browser,
    /// Run an API test script.
    ScriptApi,
    /// Run a scripted browser session.
    ScriptBrowser,
}

impl MonitorType {
    /// Whether monitors of this type are backed by a script sub-resource.
    pub const fn is_scripted(self) -> bool {
        matches!(self, Self::ScriptApi | Self::ScriptBrowser)
    }
}

/// Monitor status.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorStatus {
    /// Checks run and alert.
    Enabled,
    /// Checks run without alerting.
    Muted,
    /// Checks do not run.
    Disabled,
}

/// A synthetics monitor as returned by `GET /monitors/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    /// Service-assigned id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Monitor name
    pub name: String,
    /// Monitor type
    #[serde(rename = "type")]
    pub monitor_type: MonitorType,
    /// Check frequency in minutes
    pub frequency: u32,
    /// Checked URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Location codes the check runs from
    #[serde(default)]
    pub locations: Vec<String>,
    /// Monitor status
    pub status: MonitorStatus,
    /// SLA threshold in seconds
    #[serde(default)]
    pub sla_threshold: f64,
    /// Type-conditional settings
    #[serde(default, skip_serializing_if = "MonitorOptions::is_empty")]
    pub options: MonitorOptions,
    /// Owner of the monitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// API version the monitor was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Monitor record returned by the list endpoint, with parsed timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedMonitor {
    /// Service-assigned id
    pub id: String,
    /// Monitor name
    pub name: String,
    /// Monitor type
    pub monitor_type: MonitorType,
    /// Check frequency in minutes
    pub frequency: u32,
    /// Checked URI
    pub uri: Option<String>,
    /// Location codes the check runs from
    pub locations: Vec<String>,
    /// Monitor status
    pub status: MonitorStatus,
    /// SLA threshold in seconds
    pub sla_threshold: f64,
    /// Raw `options` object
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Last modification time
    pub modified_at: DateTime<FixedOffset>,
    /// Creation time
    pub created_at: DateTime<FixedOffset>,
    /// Owner of the monitor
    pub user_id: Option<u64>,
    /// API version the monitor was created with
    pub api_version: Option<String>,
}

/// List record as it appears on the wire, before timestamps are parsed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawExtendedMonitor {
    id: String,
    name: String,
    #[serde(rename = "type")]
    monitor_type: MonitorType,
    frequency: u32,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    locations: Vec<String>,
    status: MonitorStatus,
    #[serde(default)]
    sla_threshold: f64,
    #[serde(default)]
    options: serde_json::Map<String, serde_json::Value>,
    modified_at: String,
    created_at: String,
    #[serde(default)]
    user_id: Option<u64>,
    #[serde(default)]
    api_version: Option<String>,
}

/// Whether `value` ends in a `+hhmm`/`-hhmm` offset. `%z` alone also accepts `+hh:mm`.
fn has_numeric_offset(value: &str) -> bool {
    let bytes = value.as_bytes();
    let offset = bytes.len().checked_sub(5).and_then(|start| bytes.get(start..));
    matches!(
        offset,
        Some([b'+' | b'-', digits @ ..]) if digits.iter().all(u8::is_ascii_digit)
    )
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    let invalid = |source| Error::TimestampParse {
        id: id.to_owned(),
        value: value.to_owned(),
        source,
    };
    let parsed = DateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| invalid(Some(e)))?;
    if !has_numeric_offset(value) {
        return Err(invalid(None));
    }
    Ok(parsed)
}

impl TryFrom<RawExtendedMonitor> for ExtendedMonitor {
    type Error = Error;

    fn try_from(raw: RawExtendedMonitor) -> Result<Self> {
        let modified_at = parse_timestamp(&raw.id, &raw.modified_at)?;
        let created_at = parse_timestamp(&raw.id, &raw.created_at)?;

        Ok(Self {
            id: raw.id,
            name: raw.name,
            monitor_type: raw.monitor_type,
            frequency: raw.frequency,
            uri: raw.uri,
            locations: raw.locations,
            status: raw.status,
            sla_threshold: raw.sla_threshold,
            options: raw.options,
            modified_at,
            created_at,
            user_id: raw.user_id,
            api_version: raw.api_version,
        })
    }
}

/// Pagination for [`Client::get_all_monitors`](crate::Client::get_all_monitors).
/// Zero values are left out of the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetAllMonitorsArgs {
    /// Number of monitors to skip
    pub offset: u32,
    /// Maximum number of monitors to return
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGetAllMonitorsResponse {
    #[serde(default)]
    pub(crate) monitors: Vec<RawExtendedMonitor>,
    #[serde(default)]
    pub(crate) count: u64,
}

/// Response of [`Client::get_all_monitors`](crate::Client::get_all_monitors).
#[derive(Debug, Clone, PartialEq)]
pub struct GetAllMonitorsResponse {
    /// Monitors on this page
    pub monitors: Vec<ExtendedMonitor>,
    /// Total number of monitors in the account
    pub count: u64,
}

/// Arguments to [`Client::create_monitor`](crate::Client::create_monitor).
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitorArgs {
    /// Monitor name
    pub name: String,
    /// Monitor type
    pub monitor_type: MonitorType,
    /// Check frequency in minutes
    pub frequency: u32,
    /// Checked URI, dropped for types that do not take one
    pub uri: Option<String>,
    /// Location codes
    pub locations: Vec<String>,
    /// Monitor status
    pub status: MonitorStatus,
    /// SLA threshold; the service picks a default when unset
    pub sla_threshold: Option<f64>,
    /// Type-conditional settings; fields illegal for `monitor_type` are dropped
    pub options: MonitorOptions,
}

/// Arguments to [`Client::update_monitor`](crate::Client::update_monitor).
///
/// Only `Some` fields are sent.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMonitorArgs {
    /// Monitor name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Check frequency in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    /// Checked URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Location codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    /// Monitor status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MonitorStatus>,
    /// SLA threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_threshold: Option<f64>,
    /// Type-conditional settings, sent only when at least one is set
    #[serde(skip_serializing_if = "MonitorOptions::is_empty")]
    pub options: MonitorOptions,
}

/// Private location a script runs from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScriptLocation {
    /// Private location name
    pub name: String,
    /// HMAC secret for the location
    #[debug(skip)]
    pub hmac: String,
}

/// Arguments to [`Client::update_monitor_script`](crate::Client::update_monitor_script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMonitorScriptArgs {
    /// Raw script text; must not be empty
    pub script_text: String,
    /// Private locations, in order
    pub script_locations: Vec<ScriptLocation>,
}

/// A synthetics alert condition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AlertCondition {
    /// Service-assigned id
    pub id: u64,
    /// Condition name
    pub name: String,
    /// Monitor the condition watches
    pub monitor_id: String,
    /// Runbook link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    /// Whether the condition is enabled
    pub enabled: bool,
}

/// Arguments to [`Client::create_alert_condition`](crate::Client::create_alert_condition).
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CreateAlertConditionArgs {
    /// Condition name
    pub name: String,
    /// Monitor the condition watches
    pub monitor_id: String,
    /// Runbook link, omitted unless set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    /// Whether the condition is enabled
    pub enabled: bool,
}

/// Arguments to [`Client::update_alert_condition`](crate::Client::update_alert_condition).
pub type UpdateAlertConditionArgs = CreateAlertConditionArgs;

/// `{"synthetics_condition": ...}` envelope used by the alerts API for single items.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ConditionEnvelope<T> {
    pub(crate) synthetics_condition: T,
}

/// `{"synthetics_conditions": [...]}` envelope used by the alerts API for lists.
#[derive(Debug, Deserialize)]
pub(crate) struct ConditionListEnvelope {
    #[serde(default)]
    pub(crate) synthetics_conditions: Vec<AlertCondition>,
}
