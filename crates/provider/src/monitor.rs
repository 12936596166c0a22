//! Reconciler for synthetics monitors and their scripts.

use async_trait::async_trait;
use eyre::{Report, Result, WrapErr};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use synthetics::{
    ALLOWED_FREQUENCIES, Client, ConditionalField, CreateMonitorArgs, Error as SyntheticsError,
    HttpExecutor, MonitorOptions, MonitorStatus, MonitorType, ScriptLocation, UpdateMonitorArgs,
    UpdateMonitorScriptArgs,
};
use tracing::{debug, info, warn};

use crate::{
    error::ReconcileError,
    resource::{Reconciler, ResourceData},
};

#[cfg(test)]
mod tests;

/// Declared state of a monitor.
///
/// The four option fields are tri-state: `None` means "not configured" and is never
/// confused with `false` or an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRecord {
    /// Monitor name
    pub name: String,
    /// Monitor type, fixed at creation
    pub monitor_type: MonitorType,
    /// Check frequency in minutes
    pub frequency: u32,
    /// Checked URI (SIMPLE and BROWSER only)
    pub uri: Option<String>,
    /// Location codes
    pub locations: BTreeSet<String>,
    /// Monitor status
    pub status: MonitorStatus,
    /// SLA threshold, assigned by the service when unset
    pub sla_threshold: Option<f64>,
    /// Text the response must contain
    pub validation_string: Option<String>,
    /// Verify the TLS certificate
    pub verify_ssl: Option<bool>,
    /// Skip the initial HEAD request
    pub bypass_head_request: Option<bool>,
    /// Fail the check on redirects
    pub treat_redirect_as_failure: Option<bool>,
    /// Script text when declared, its [`fingerprint`] once written or read
    pub script: Option<String>,
    /// Private locations the script runs from
    pub script_locations: Vec<ScriptLocation>,
}

impl MonitorRecord {
    /// An enabled monitor with no optional settings.
    pub fn new(
        name: impl Into<String>,
        monitor_type: MonitorType,
        frequency: u32,
        locations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            monitor_type,
            frequency,
            uri: None,
            locations: locations.into_iter().map(Into::into).collect(),
            status: MonitorStatus::Enabled,
            sla_threshold: None,
            validation_string: None,
            verify_ssl: None,
            bypass_head_request: None,
            treat_redirect_as_failure: None,
            script: None,
            script_locations: Vec::new(),
        }
    }

    /// Check the constraints the service enforces on every write.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if !ALLOWED_FREQUENCIES.contains(&self.frequency) {
            return Err(ReconcileError::InvalidRecord(format!(
                "frequency {} is not one of {ALLOWED_FREQUENCIES:?}",
                self.frequency
            )));
        }
        if self.locations.is_empty() {
            return Err(ReconcileError::InvalidRecord("at least one location is required".into()));
        }
        Ok(())
    }

    fn options(&self) -> MonitorOptions {
        MonitorOptions {
            validation_string: self.validation_string.clone(),
            verify_ssl: self.verify_ssl,
            bypass_head_request: self.bypass_head_request,
            treat_redirect_as_failure: self.treat_redirect_as_failure,
        }
    }

    /// Script update for this record, if it declares one that can be sent.
    fn script_args(&self) -> Option<UpdateMonitorScriptArgs> {
        let script = self.script.as_deref().filter(|s| !s.is_empty())?;
        if !self.monitor_type.is_scripted() {
            warn!(
                name = %self.name,
                monitor_type = ?self.monitor_type,
                "script ignored for monitor type without scripts"
            );
            return None;
        }
        Some(UpdateMonitorScriptArgs {
            script_text: script.to_owned(),
            script_locations: self.script_locations.clone(),
        })
    }
}

/// Monitor attributes that can be reported as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorField {
    /// `name`
    Name,
    /// `frequency`
    Frequency,
    /// `uri`
    Uri,
    /// `locations`
    Locations,
    /// `status`
    Status,
    /// `sla_threshold`
    SlaThreshold,
    /// `validation_string`
    ValidationString,
    /// `verify_ssl`
    VerifySsl,
    /// `bypass_head_request`
    BypassHeadRequest,
    /// `treat_redirect_as_failure`
    TreatRedirectAsFailure,
    /// `script`
    Script,
    /// `script_locations`
    ScriptLocations,
}

/// Resource data of a monitor.
pub type MonitorData = ResourceData<MonitorRecord, MonitorField>;

/// Hex-encoded SHA-256 of a script, stored in place of the script text.
pub fn fingerprint(script: &str) -> String {
    hex::encode(Sha256::digest(script.as_bytes()))
}

/// Reconciles [`MonitorData`] against the synthetics API.
#[derive(Debug, Clone)]
pub struct MonitorResource<E = reqwest::Client> {
    client: Client<E>,
}

impl<E: HttpExecutor> MonitorResource<E> {
    /// Create a reconciler using `client`.
    pub const fn new(client: Client<E>) -> Self {
        Self { client }
    }

    /// Build the partial update for `data`.
    ///
    /// Name, frequency, status and a legal `uri` are always sent. Everything else is sent
    /// only when reported changed and accepted by the monitor type. A changed flag that is
    /// now unset is sent as `false` so the remote value follows.
    fn update_args(data: &MonitorData) -> UpdateMonitorArgs {
        let record = data.record();
        let accepts = |field| record.monitor_type.accepts(field);
        let flag = |field, option: ConditionalField, value: Option<bool>| {
            (data.has_change(field) && accepts(option)).then_some(value.unwrap_or(false))
        };
        let mut args = UpdateMonitorArgs {
            name: Some(record.name.clone()),
            frequency: Some(record.frequency),
            status: Some(record.status),
            uri: record.uri.clone().filter(|_| accepts(ConditionalField::Uri)),
            ..Default::default()
        };

        if data.has_change(MonitorField::Locations) {
            args.locations = Some(record.locations.iter().cloned().collect());
        }
        if data.has_change(MonitorField::SlaThreshold) {
            args.sla_threshold = record.sla_threshold;
        }
        if data.has_change(MonitorField::ValidationString)
            && accepts(ConditionalField::ValidationString)
        {
            args.options.validation_string =
                record.validation_string.clone().filter(|s| !s.is_empty());
        }
        args.options.verify_ssl =
            flag(MonitorField::VerifySsl, ConditionalField::VerifySsl, record.verify_ssl);
        args.options.bypass_head_request = flag(
            MonitorField::BypassHeadRequest,
            ConditionalField::BypassHeadRequest,
            record.bypass_head_request,
        );
        args.options.treat_redirect_as_failure = flag(
            MonitorField::TreatRedirectAsFailure,
            ConditionalField::TreatRedirectAsFailure,
            record.treat_redirect_as_failure,
        );
        args
    }
}

#[async_trait]
impl<E: HttpExecutor> Reconciler for MonitorResource<E> {
    type Record = MonitorRecord;
    type Field = MonitorField;

    async fn create(&self, data: &mut MonitorData) -> Result<()> {
        let record = data.record();
        record.validate()?;

        let args = CreateMonitorArgs {
            name: record.name.clone(),
            monitor_type: record.monitor_type,
            frequency: record.frequency,
            uri: record.uri.clone(),
            locations: record.locations.iter().cloned().collect(),
            status: record.status,
            sla_threshold: record.sla_threshold,
            options: record.options(),
        };
        let monitor = self
            .client
            .create_monitor(&args)
            .await
            .wrap_err_with(|| format!("could not create monitor {}", args.name))?;
        info!(id = %monitor.id, name = %monitor.name, "monitor created");

        data.set_id(monitor.id.clone());
        data.record_mut().sla_threshold = Some(monitor.sla_threshold);

        let Some(script) = data.record().script_args() else {
            return Ok(());
        };
        if let Err(source) = self.client.update_monitor_script(&monitor.id, &script).await {
            return Err(ReconcileError::ScriptNotAttached { monitor_id: monitor.id, source }.into());
        }
        debug!(id = %monitor.id, "monitor script attached");
        data.record_mut().script = Some(fingerprint(&script.script_text));
        Ok(())
    }

    async fn read(&self, data: &mut MonitorData) -> Result<()> {
        let id = data.id().to_owned();
        let monitor = self
            .client
            .get_monitor(&id)
            .await
            .wrap_err_with(|| format!("could not get monitor {id}"))?;

        // None: no script sub-resource. Some(None): script missing remotely.
        let script = if monitor.monitor_type.is_scripted() {
            match self.client.get_monitor_script(&id).await {
                Ok(text) => Some(Some(fingerprint(&text))),
                Err(SyntheticsError::ScriptNotFound { .. }) => Some(None),
                Err(e) => {
                    return Err(
                        Report::new(e).wrap_err(format!("could not get script of monitor {id}"))
                    );
                }
            }
        } else {
            None
        };

        let record = data.record_mut();
        match script {
            Some(Some(fingerprint)) => record.script = Some(fingerprint),
            Some(None) => {
                record.script = None;
                record.script_locations.clear();
            }
            None => {}
        }

        record.name = monitor.name;
        record.monitor_type = monitor.monitor_type;
        record.frequency = monitor.frequency;
        record.uri = monitor.uri;
        record.locations = monitor.locations.into_iter().collect();
        record.status = monitor.status;
        record.sla_threshold = Some(monitor.sla_threshold);
        record.validation_string = monitor.options.validation_string;
        record.verify_ssl = monitor.options.verify_ssl;
        record.bypass_head_request = monitor.options.bypass_head_request;
        record.treat_redirect_as_failure = monitor.options.treat_redirect_as_failure;
        Ok(())
    }

    async fn update(&self, data: &mut MonitorData) -> Result<()> {
        data.record().validate()?;
        let id = data.id().to_owned();

        let args = Self::update_args(data);
        let monitor = self
            .client
            .update_monitor(&id, &args)
            .await
            .wrap_err_with(|| format!("could not update monitor {id}"))?;
        data.record_mut().sla_threshold = Some(monitor.sla_threshold);

        let script_changed = data.has_change(MonitorField::Script)
            || data.has_change(MonitorField::ScriptLocations);
        if !script_changed {
            return Ok(());
        }
        let Some(script) = data.record().script_args() else {
            debug!(%id, "no script to send, remote script left in place");
            return Ok(());
        };
        self.client
            .update_monitor_script(&id, &script)
            .await
            .wrap_err_with(|| format!("could not update script of monitor {id}"))?;
        data.record_mut().script = Some(fingerprint(&script.script_text));
        Ok(())
    }

    async fn delete(&self, data: &MonitorData) -> Result<()> {
        self.client
            .delete_monitor(data.id())
            .await
            .wrap_err_with(|| format!("could not delete monitor {}", data.id()))?;
        info!(id = %data.id(), "monitor deleted");
        Ok(())
    }

    async fn exists(&self, data: &MonitorData) -> Result<bool> {
        match self.client.get_monitor(data.id()).await {
            Ok(_) => Ok(true),
            Err(SyntheticsError::MonitorNotFound { .. }) => Ok(false),
            Err(e) => Err(Report::new(e).wrap_err(format!("could not get monitor {}", data.id()))),
        }
    }
}
