//! Reconciler for synthetics alert conditions.
//!
//! A condition is addressed by the pair `(policy_id, id)`. The id is stored as the
//! decimal string of the service-assigned integer.

use async_trait::async_trait;
use eyre::{Report, Result, WrapErr};
use synthetics::{
    AlertCondition, Client, CreateAlertConditionArgs, Error as SyntheticsError, HttpExecutor,
    UpdateAlertConditionArgs,
};
use tracing::info;

use crate::{
    error::ReconcileError,
    resource::{Reconciler, ResourceData},
};


/// Declared state of an alert condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertConditionRecord {
    /// Owning alert policy, fixed at creation
    pub policy_id: u64,
    /// Condition name
    pub name: String,
    /// Watched monitor, fixed at creation
    pub monitor_id: String,
    /// Whether the condition is enabled
    pub enabled: bool,
    /// Runbook link
    pub runbook_url: Option<String>,
}

/// Alert condition attributes that can be reported as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertConditionField {
    /// `name`
    Name,
    /// `monitor_id`
    MonitorId,
    /// `enabled`
    Enabled,
    /// `runbook_url`
    RunbookUrl,
}

/// Resource data of an alert condition.
pub type AlertConditionData = ResourceData<AlertConditionRecord, AlertConditionField>;

impl AlertConditionData {
    /// Resource data for an existing condition named by `policy_id:condition_id`.
    ///
    /// Only the shape is checked here. A policy id that is not numeric becomes `0`, which
    /// the following read rejects.
    pub fn import(import_id: &str) -> Result<Self, ReconcileError> {
        let invalid = || ReconcileError::InvalidImportId(import_id.to_owned());
        let (policy_id, condition_id) = import_id.split_once(':').ok_or_else(invalid)?;
        if policy_id.is_empty() || condition_id.is_empty() || condition_id.contains(':') {
            return Err(invalid());
        }

        let record = AlertConditionRecord {
            policy_id: policy_id.parse().unwrap_or_default(),
            ..Default::default()
        };
        Ok(Self::with_id(condition_id, record))
    }
}

/// Reconciles [`AlertConditionData`] against the alerts API.
#[derive(Debug, Clone)]
pub struct AlertConditionResource<E = reqwest::Client> {
    client: Client<E>,
}

impl<E: HttpExecutor> AlertConditionResource<E> {
    /// Create a reconciler using `client`.
    pub const fn new(client: Client<E>) -> Self {
        Self { client }
    }
}

fn condition_id(data: &AlertConditionData) -> Result<u64, ReconcileError> {
    data.id().parse().map_err(|_| ReconcileError::InvalidConditionId(data.id().to_owned()))
}

fn write_back(record: &mut AlertConditionRecord, condition: AlertCondition) {
    record.name = condition.name;
    record.monitor_id = condition.monitor_id;
    record.enabled = condition.enabled;
    record.runbook_url = condition.runbook_url;
}

#[async_trait]
impl<E: HttpExecutor> Reconciler for AlertConditionResource<E> {
    type Record = AlertConditionRecord;
    type Field = AlertConditionField;

    async fn create(&self, data: &mut AlertConditionData) -> Result<()> {
        let record = data.record();
        let policy_id = record.policy_id;
        let args = CreateAlertConditionArgs {
            name: record.name.clone(),
            monitor_id: record.monitor_id.clone(),
            runbook_url: record.runbook_url.clone(),
            enabled: record.enabled,
        };

        let condition = self
            .client
            .create_alert_condition(policy_id, &args)
            .await
            .wrap_err_with(|| format!("could not create alert condition in policy {policy_id}"))?;
        info!(id = condition.id, policy_id, "alert condition created");

        data.set_id(condition.id.to_string());
        Ok(())
    }

    async fn read(&self, data: &mut AlertConditionData) -> Result<()> {
        let id = condition_id(data)?;
        let policy_id = data.record().policy_id;

        let condition = self
            .client
            .get_alert_condition(policy_id, id)
            .await
            .wrap_err_with(|| format!("could not get alert condition {id}"))?;
        write_back(data.record_mut(), condition);
        Ok(())
    }

    async fn update(&self, data: &mut AlertConditionData) -> Result<()> {
        let id = condition_id(data)?;
        let record = data.record();
        let policy_id = record.policy_id;
        let args = UpdateAlertConditionArgs {
            name: record.name.clone(),
            monitor_id: record.monitor_id.clone(),
            runbook_url: record
                .runbook_url
                .clone()
                .filter(|_| data.has_change(AlertConditionField::RunbookUrl)),
            enabled: record.enabled,
        };

        let condition = self
            .client
            .update_alert_condition(policy_id, id, &args)
            .await
            .wrap_err_with(|| format!("could not update alert condition {id}"))?;
        write_back(data.record_mut(), condition);
        Ok(())
    }

    async fn delete(&self, data: &AlertConditionData) -> Result<()> {
        let id = condition_id(data)?;
        self.client
            .delete_alert_condition(id)
            .await
            .wrap_err_with(|| format!("could not delete alert condition {id}"))?;
        info!(id, "alert condition deleted");
        Ok(())
    }

    async fn exists(&self, data: &AlertConditionData) -> Result<bool> {
        let id = condition_id(data)?;
        match self.client.get_alert_condition(data.record().policy_id, id).await {
            Ok(_) => Ok(true),
            Err(SyntheticsError::AlertConditionNotFound { .. }) => Ok(false),
            Err(e) => Err(Report::new(e).wrap_err(format!("could not get alert condition {id}"))),
        }
    }
}
