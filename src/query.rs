use crate::{
    error::BookingError,
    reservation::Reservation,
    resource::{Resource, ResourceId},
    store::store::ResourceStore,
};
use serde::Serialize;

/// Comparison of a resource's cached capacity with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityAudit {
    pub resource_id: ResourceId,
    pub total_capacity: u32,
    pub available_capacity: u32,
    pub booked: u32,
    pub reserved: u64,
    pub reservation_count: usize,
}

impl CapacityAudit {
    /// Booked plus remaining equals total.
    pub fn is_balanced(&self) -> bool {
        u64::from(self.booked) == self.reserved
    }
}

/// Read-only projections. Nothing here takes a row lock.
#[derive(Clone)]
pub struct QueryService<S: ResourceStore> {
    store: S,
}

impl<S: ResourceStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_resource(&self, id: ResourceId) -> Result<Resource, BookingError> {
        self.store
            .get(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>, BookingError> {
        Ok(self.store.list().await?)
    }

    pub async fn reservations(&self, id: ResourceId) -> Result<Vec<Reservation>, BookingError> {
        Ok(self.store.reservations(id).await?)
    }

    /// The row and ledger are read separately, so only an audit taken while
    /// no bookings are in flight is guaranteed to balance.
    pub async fn audit(&self, id: ResourceId) -> Result<CapacityAudit, BookingError> {
        let resource = self.get_resource(id).await?;
        let ledger = self.reservations(id).await?;
        Ok(CapacityAudit {
            resource_id: id,
            total_capacity: resource.total_capacity,
            available_capacity: resource.available_capacity,
            booked: resource.booked(),
            reserved: ledger.iter().map(|r| u64::from(r.quantity)).sum(),
            reservation_count: ledger.len(),
        })
    }
}
