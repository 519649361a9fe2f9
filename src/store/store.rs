use crate::{
    error::StoreError,
    reservation::{NewReservation, Reservation},
    resource::{NewResource, Resource, ResourceId},
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

/// Conditional write of a resource's capacity together with the ledger entry
/// that accounts for it. Applied only while the row still carries
/// `expected_version`.
#[derive(Debug, Clone)]
pub struct Drawdown {
    pub expected_version: u64,
    pub remaining: u32,
    pub reservation: NewReservation,
}

impl Drawdown {
    pub fn resource_id(&self) -> ResourceId {
        self.reservation.resource_id
    }
}

/// Exclusive hold on one resource row. Released on drop.
#[derive(Debug)]
pub struct RowLock {
    resource_id: ResourceId,
    _guard: OwnedMutexGuard<()>,
}

impl RowLock {
    pub fn new(resource_id: ResourceId, guard: OwnedMutexGuard<()>) -> Self {
        trace!(resource_id, "row lock acquired");
        Self {
            resource_id,
            _guard: guard,
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }
}

impl Drop for RowLock {
    fn drop(&mut self) {
        trace!(resource_id = self.resource_id, "row lock released");
    }
}

#[async_trait]
pub trait ResourceStore: Clone + Send + Sync + 'static {
    async fn create(&self, new: NewResource) -> Result<Resource, StoreError>;

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError>;

    /// All resources in creation order.
    async fn list(&self) -> Result<Vec<Resource>, StoreError>;

    /// Waits at most `wait` for exclusive access to the row.
    async fn lock(&self, id: ResourceId, wait: Duration) -> Result<RowLock, StoreError>;

    /// Applies the drawdown and appends its reservation as one atomic step, or
    /// fails with [`StoreError::Conflict`] leaving both untouched.
    async fn commit(&self, drawdown: Drawdown) -> Result<(Resource, Reservation), StoreError>;

    /// Ledger entries for one resource in id order.
    async fn reservations(&self, id: ResourceId) -> Result<Vec<Reservation>, StoreError>;
}

pub(crate) fn validate_new(new: &NewResource) -> Result<(), StoreError> {
    if new.total_capacity == 0 {
        return Err(StoreError::Invalid(format!(
            "{} must have a positive capacity",
            new.name
        )));
    }
    if new.name.trim().is_empty() {
        return Err(StoreError::Invalid("name must not be empty".to_string()));
    }
    Ok(())
}

/// Version and arithmetic checks a store runs against the current row before
/// applying a drawdown.
pub(crate) fn check_drawdown(row: &Resource, drawdown: &Drawdown) -> Result<(), StoreError> {
    if row.version != drawdown.expected_version {
        return Err(StoreError::Conflict {
            resource_id: row.id,
            expected: drawdown.expected_version,
            actual: row.version,
        });
    }
    if row.available_capacity.checked_sub(drawdown.reservation.quantity) != Some(drawdown.remaining)
    {
        return Err(StoreError::Invalid(format!(
            "drawdown of {} from {} cannot leave {}",
            drawdown.reservation.quantity, row.available_capacity, drawdown.remaining
        )));
    }
    Ok(())
}
