//! Declared resource state and the lifecycle hooks that reconcile it.

use async_trait::async_trait;
use eyre::Result;
use std::{collections::HashSet, hash::Hash};

/// The state of one declared resource as seen by the reconciler.
///
/// `id` is empty until the resource has been created remotely. `changed` holds the
/// fields that differ between the previous and the desired state and is only consulted
/// by [`Reconciler::update`].
#[derive(Debug, Clone)]
pub struct ResourceData<T, F> {
    id: String,
    record: T,
    changed: HashSet<F>,
}

impl<T, F: Eq + Hash> ResourceData<T, F> {
    /// Data for a resource that does not exist yet.
    pub fn new(record: T) -> Self {
        Self { id: String::new(), record, changed: HashSet::new() }
    }

    /// Data for a resource known by `id`.
    pub fn with_id(id: impl Into<String>, record: T) -> Self {
        Self { id: id.into(), record, changed: HashSet::new() }
    }

    /// Mark `fields` as changed.
    pub fn with_changes(mut self, fields: impl IntoIterator<Item = F>) -> Self {
        self.changed.extend(fields);
        self
    }

    /// Remote id, empty when not yet created.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record the remote id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// The resource attributes.
    pub const fn record(&self) -> &T {
        &self.record
    }

    /// Mutable access to the resource attributes.
    pub const fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    /// Whether `field` was reported as changed.
    pub fn has_change(&self, field: F) -> bool {
        self.changed.contains(&field)
    }
}

/// Lifecycle hooks driven by a declarative framework.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Resource attributes
    type Record: Send + Sync;
    /// Names of the attributes that can change
    type Field: Eq + Hash + Send + Sync;

    /// Create the resource remotely and record its id.
    async fn create(&self, data: &mut ResourceData<Self::Record, Self::Field>) -> Result<()>;

    /// Refresh the record from the remote state.
    async fn read(&self, data: &mut ResourceData<Self::Record, Self::Field>) -> Result<()>;

    /// Push the changed attributes.
    async fn update(&self, data: &mut ResourceData<Self::Record, Self::Field>) -> Result<()>;

    /// Delete the resource remotely.
    async fn delete(&self, data: &ResourceData<Self::Record, Self::Field>) -> Result<()>;

    /// Whether the resource still exists remotely.
    async fn exists(&self, data: &ResourceData<Self::Record, Self::Field>) -> Result<bool>;
}
