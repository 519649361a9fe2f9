use crate::{
    error::{BookingError, StoreError},
    reservation::{Booking, NewReservation, requester_or_anonymous},
    resource::ResourceId,
    store::store::{Drawdown, ResourceStore},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// How a booking gets exclusive access to a resource's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exclusivity {
    /// Hold the row lock across read, check and write.
    #[default]
    Pessimistic,
    /// Read without locking and commit only if the version is unchanged,
    /// retrying on conflict.
    Optimistic,
}

impl FromStr for Exclusivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pessimistic" => Ok(Exclusivity::Pessimistic),
            "optimistic" => Ok(Exclusivity::Optimistic),
            other => Err(format!(
                "unknown exclusivity '{other}', expected 'pessimistic' or 'optimistic'"
            )),
        }
    }
}

impl fmt::Display for Exclusivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusivity::Pessimistic => f.write_str("pessimistic"),
            Exclusivity::Optimistic => f.write_str("optimistic"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub exclusivity: Exclusivity,
    /// Upper bound on waiting for a row lock.
    pub lock_timeout: Duration,
    /// Read-check-commit cycles before giving up on a contended resource.
    pub max_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            exclusivity: Exclusivity::Pessimistic,
            lock_timeout: Duration::from_secs(5),
            max_attempts: 32,
        }
    }
}

impl CoordinatorConfig {
    pub fn optimistic() -> Self {
        Self {
            exclusivity: Exclusivity::Optimistic,
            ..Self::default()
        }
    }
}

/// Serializes bookings per resource while leaving distinct resources fully
/// independent.
///
/// A booking re-reads the resource after gaining exclusivity, checks the
/// remaining capacity and commits the decrement together with its ledger
/// entry. The commit is conditional on the version that was read, so a
/// concurrent writer is detected rather than overwritten; the optimistic
/// mode relies on that alone, the pessimistic mode additionally holds the
/// row lock so conflicts cannot arise between coordinators sharing a store.
#[derive(Clone)]
pub struct BookingCoordinator<S: ResourceStore> {
    store: S,
    config: CoordinatorConfig,
}

impl<S: ResourceStore> BookingCoordinator<S> {
    pub fn new(store: S, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Books `quantity` units of `resource_id` for `requester` (anonymous when
    /// absent).
    pub async fn book(
        &self,
        resource_id: ResourceId,
        quantity: u32,
        requester: Option<&str>,
    ) -> Result<Booking, BookingError> {
        if quantity == 0 {
            return Err(BookingError::Validation(
                "Count must be at least 1".to_string(),
            ));
        }
        let requester = requester_or_anonymous(requester);

        let span = info_span!(
            "book",
            attempt_id = %Uuid::new_v4(),
            resource_id,
            quantity,
            requester = %requester,
            exclusivity = %self.config.exclusivity,
        );
        self.book_until_settled(resource_id, quantity, requester)
            .instrument(span)
            .await
    }

    async fn book_until_settled(
        &self,
        resource_id: ResourceId,
        quantity: u32,
        requester: String,
    ) -> Result<Booking, BookingError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let lock = match self.config.exclusivity {
                Exclusivity::Pessimistic => Some(
                    self.store
                        .lock(resource_id, self.config.lock_timeout)
                        .await
                        .inspect_err(|e| warn!(error = %e, "could not lock resource"))?,
                ),
                Exclusivity::Optimistic => None,
            };

            let outcome = self.try_book(resource_id, quantity, &requester).await;
            drop(lock);

            match outcome? {
                Some(booking) => {
                    info!(
                        reservation_id = booking.reservation.id,
                        remaining = booking.remaining_capacity,
                        attempt,
                        "booking confirmed"
                    );
                    return Ok(booking);
                }
                None => {
                    debug!(attempt, max_attempts, "resource changed since read, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        warn!(max_attempts, "giving up on contended resource");
        Err(BookingError::TemporarilyUnavailable {
            resource_id,
            reason: format!("still conflicting after {max_attempts} attempts"),
        })
    }

    /// One read-check-commit cycle. `Ok(None)` means another writer got there
    /// first and the cycle should be repeated.
    async fn try_book(
        &self,
        resource_id: ResourceId,
        quantity: u32,
        requester: &str,
    ) -> Result<Option<Booking>, BookingError> {
        let current = self
            .store
            .get(resource_id)
            .await?
            .ok_or(BookingError::NotFound(resource_id))?;

        let Some(remaining) = current.available_capacity.checked_sub(quantity) else {
            warn!(
                requested = quantity,
                available = current.available_capacity,
                "insufficient capacity"
            );
            return Err(BookingError::InsufficientCapacity {
                resource_id,
                requested: quantity,
                available: current.available_capacity,
            });
        };

        let drawdown = Drawdown {
            expected_version: current.version,
            remaining,
            reservation: NewReservation {
                resource_id,
                quantity,
                requester: requester.to_string(),
            },
        };

        match self.store.commit(drawdown).await {
            Ok((resource, reservation)) => Ok(Some(Booking {
                reservation,
                resource_name: resource.name,
                remaining_capacity: resource.available_capacity,
            })),
            Err(StoreError::Conflict { .. }) => Ok(None),
            Err(e) => {
                error!(error = %e, "commit failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::ErrorKind,
        reservation::Reservation,
        resource::{NewResource, Resource},
        store::{memory::MemoryStore, store::RowLock},
    };
    use async_trait::async_trait;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    /// Wraps a [`MemoryStore`] and fails commits on demand.
    #[derive(Clone, Default)]
    struct FaultyStore {
        inner: MemoryStore,
        conflicts_left: Arc<AtomicU32>,
        broken: bool,
    }

    #[async_trait]
    impl ResourceStore for FaultyStore {
        async fn create(&self, new: NewResource) -> Result<Resource, StoreError> {
            self.inner.create(new).await
        }

        async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError> {
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<Resource>, StoreError> {
            self.inner.list().await
        }

        async fn lock(&self, id: ResourceId, wait: Duration) -> Result<RowLock, StoreError> {
            self.inner.lock(id, wait).await
        }

        async fn commit(&self, drawdown: Drawdown) -> Result<(Resource, Reservation), StoreError> {
            if self.broken {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            let conflicted = self
                .conflicts_left
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok();
            if conflicted {
                return Err(StoreError::Conflict {
                    resource_id: drawdown.resource_id(),
                    expected: drawdown.expected_version,
                    actual: drawdown.expected_version + 1,
                });
            }
            self.inner.commit(drawdown).await
        }

        async fn reservations(&self, id: ResourceId) -> Result<Vec<Reservation>, StoreError> {
            self.inner.reservations(id).await
        }
    }

    async fn seeded<S: ResourceStore>(store: &S, capacity: u32) -> ResourceId {
        store
            .create(NewResource::new("Test Event", "Test Description", capacity))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_lookup() {
        let coordinator = BookingCoordinator::new(MemoryStore::new(), CoordinatorConfig::default());
        let err = coordinator.book(9999, 0, Some("user1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn missing_requester_is_anonymous() {
        let store = MemoryStore::new();
        let id = seeded(&store, 10).await;
        let coordinator = BookingCoordinator::new(store, CoordinatorConfig::default());

        let booking = coordinator.book(id, 2, None).await.unwrap();
        assert_eq!(booking.reservation.requester, "anonymous");
        assert_eq!(booking.resource_name, "Test Event");
        assert_eq!(booking.remaining_capacity, 8);
    }

    #[tokio::test]
    async fn conflicts_are_retried_transparently() {
        let store = FaultyStore::default();
        store.conflicts_left.store(2, Ordering::Release);
        let id = seeded(&store, 10).await;
        let coordinator = BookingCoordinator::new(store.clone(), CoordinatorConfig::optimistic());

        let booking = coordinator.book(id, 4, Some("user1")).await.unwrap();
        assert_eq!(booking.remaining_capacity, 6);
        assert_eq!(store.inner.ledger_len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_are_temporarily_unavailable() {
        let store = FaultyStore::default();
        store.conflicts_left.store(u32::MAX, Ordering::Release);
        let id = seeded(&store, 10).await;
        let config = CoordinatorConfig {
            max_attempts: 3,
            ..CoordinatorConfig::optimistic()
        };
        let coordinator = BookingCoordinator::new(store.clone(), config);

        let err = coordinator.book(id, 1, Some("user1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemporarilyUnavailable);
        assert_eq!(store.conflicts_left.load(Ordering::Acquire), u32::MAX - 3);
        assert_eq!(store.get(id).await.unwrap().unwrap().available_capacity, 10);
    }

    #[tokio::test]
    async fn persistence_failure_leaves_no_trace() {
        let store = FaultyStore {
            broken: true,
            ..FaultyStore::default()
        };
        let id = seeded(&store, 10).await;
        let coordinator = BookingCoordinator::new(store.clone(), CoordinatorConfig::default());

        let err = coordinator.book(id, 1, Some("user1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.get(id).await.unwrap().unwrap().available_capacity, 10);
        assert!(store.reservations(id).await.unwrap().is_empty());

        // the row lock was released on the error path
        assert!(store.lock(id, Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn lock_wait_is_bounded() {
        let store = MemoryStore::new();
        let id = seeded(&store, 10).await;
        let config = CoordinatorConfig {
            lock_timeout: Duration::from_millis(20),
            ..CoordinatorConfig::default()
        };
        let coordinator = BookingCoordinator::new(store.clone(), config);

        let held = store.lock(id, Duration::from_millis(20)).await.unwrap();
        let err = coordinator.book(id, 1, Some("user1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemporarilyUnavailable);
        drop(held);

        let booking = coordinator.book(id, 1, Some("user1")).await.unwrap();
        assert_eq!(booking.remaining_capacity, 9);
    }

    #[test]
    fn exclusivity_parses_from_config_strings() {
        assert_eq!("Optimistic".parse::<Exclusivity>(), Ok(Exclusivity::Optimistic));
        assert_eq!(" pessimistic ".parse::<Exclusivity>(), Ok(Exclusivity::Pessimistic));
        assert!("eventual".parse::<Exclusivity>().is_err());
    }
}
