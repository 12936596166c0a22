use thiserror::Error;

/// Reconciler failures that callers may want to match on.
///
/// They are carried inside the [`eyre::Report`] returned by the lifecycle hooks and can
/// be recovered with [`eyre::Report::downcast_ref`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The monitor was created but attaching its script failed. The monitor id is
    /// already recorded, so the monitor is known to exist remotely.
    #[error("monitor {monitor_id} was created but its script could not be attached")]
    ScriptNotAttached {
        /// Id of the created monitor
        monitor_id: String,
        /// Script update failure
        #[source]
        source: synthetics::Error,
    },

    /// An import id was not of the form `policy_id:condition_id`.
    #[error("import id {0:?} should consist of policy_id:condition_id")]
    InvalidImportId(String),

    /// A stored alert condition id is not a decimal integer.
    #[error("alert condition id {0:?} is not numeric")]
    InvalidConditionId(String),

    /// The declared record violates a constraint of the service.
    #[error("invalid monitor: {0}")]
    InvalidRecord(String),
}
