use super::store::{Drawdown, ResourceStore, RowLock, check_drawdown, validate_new};
use crate::{
    error::StoreError,
    reservation::Reservation,
    resource::{NewResource, Resource, ResourceId},
};
use async_trait::async_trait;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::Mutex, time::timeout};

#[derive(Default)]
struct Tables {
    rows: DashMap<ResourceId, Resource>,
    row_locks: DashMap<ResourceId, Arc<Mutex<()>>>,
    ledger: SkipMap<u64, Reservation>,
    resource_seq: AtomicU64,
    reservation_seq: AtomicU64,
}

/// Shared in-process store. Rows live in a sharded map, each with its own
/// async mutex for the pessimistic path; the ledger is a lock-free skiplist
/// keyed by reservation id.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries across all resources.
    pub fn ledger_len(&self) -> usize {
        self.tables.ledger.len()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn create(&self, new: NewResource) -> Result<Resource, StoreError> {
        validate_new(&new)?;
        let id = self.tables.resource_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let resource = Resource {
            id,
            name: new.name,
            description: new.description,
            total_capacity: new.total_capacity,
            available_capacity: new.total_capacity,
            version: 0,
        };
        self.tables.row_locks.insert(id, Arc::new(Mutex::new(())));
        self.tables.rows.insert(id, resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError> {
        Ok(self.tables.rows.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Resource>, StoreError> {
        let mut all: Vec<Resource> = self.tables.rows.iter().map(|r| r.value().clone()).collect();
        // ids are handed out in creation order
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn lock(&self, id: ResourceId, wait: Duration) -> Result<RowLock, StoreError> {
        let row_lock = match self.tables.row_locks.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Err(StoreError::NotFound(id)),
        };
        let guard = timeout(wait, row_lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(id))?;
        Ok(RowLock::new(id, guard))
    }

    async fn commit(&self, drawdown: Drawdown) -> Result<(Resource, Reservation), StoreError> {
        let id = drawdown.resource_id();
        // the shard write guard keeps readers of this row out until both
        // the ledger entry and the new capacity are in place
        let mut row = self
            .tables
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        check_drawdown(&row, &drawdown)?;

        let reservation_id = self.tables.reservation_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let reservation = drawdown.reservation.into_reservation(reservation_id);
        self.tables.ledger.insert(reservation_id, reservation.clone());

        row.available_capacity = drawdown.remaining;
        row.version += 1;
        Ok((row.clone(), reservation))
    }

    async fn reservations(&self, id: ResourceId) -> Result<Vec<Reservation>, StoreError> {
        if !self.tables.rows.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(self
            .tables
            .ledger
            .iter()
            .filter(|e| e.value().resource_id == id)
            .map(|e| e.value().clone())
            .collect())
    }
}
