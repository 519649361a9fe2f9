use super::store::{Drawdown, ResourceStore, RowLock, check_drawdown, validate_new};
use crate::{
    error::StoreError,
    reservation::Reservation,
    resource::{NewResource, Resource, ResourceId},
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, UnboundedSender},
        oneshot,
    },
    time::timeout,
};
use tracing::{debug, info};

type Reply<T> = oneshot::Sender<T>;

enum StoreCmd {
    Create {
        new: NewResource,
        reply: Reply<Result<Resource, StoreError>>,
    },
    Get {
        id: ResourceId,
        reply: Reply<Option<Resource>>,
    },
    List {
        reply: Reply<Vec<Resource>>,
    },
    RowLock {
        id: ResourceId,
        reply: Reply<Option<Arc<Mutex<()>>>>,
    },
    Commit {
        drawdown: Drawdown,
        reply: Reply<Result<(Resource, Reservation), StoreError>>,
    },
    Reservations {
        id: ResourceId,
        reply: Reply<Option<Vec<Reservation>>>,
    },
    Shutdown,
}

#[derive(Default)]
struct State {
    rows: BTreeMap<ResourceId, Resource>,
    row_locks: HashMap<ResourceId, Arc<Mutex<()>>>,
    ledger: Vec<Reservation>,
    next_resource_id: ResourceId,
    next_reservation_id: u64,
}

impl State {
    fn create(&mut self, new: NewResource) -> Result<Resource, StoreError> {
        validate_new(&new)?;
        self.next_resource_id += 1;
        let resource = Resource {
            id: self.next_resource_id,
            name: new.name,
            description: new.description,
            total_capacity: new.total_capacity,
            available_capacity: new.total_capacity,
            version: 0,
        };
        self.row_locks.insert(resource.id, Arc::new(Mutex::new(())));
        self.rows.insert(resource.id, resource.clone());
        Ok(resource)
    }

    fn commit(&mut self, drawdown: Drawdown) -> Result<(Resource, Reservation), StoreError> {
        let id = drawdown.resource_id();
        let row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        check_drawdown(row, &drawdown)?;

        self.next_reservation_id += 1;
        let reservation = drawdown.reservation.into_reservation(self.next_reservation_id);
        row.available_capacity = drawdown.remaining;
        row.version += 1;
        self.ledger.push(reservation.clone());
        Ok((row.clone(), reservation))
    }
}

/// Store owned by a single background task. Every read and write is a
/// message, so a commit is applied between two other commands and never
/// interleaved with them. Row locks are handed out by the task and awaited by
/// the caller.
#[derive(Clone)]
pub struct ActorStore {
    tx_cmd: UnboundedSender<StoreCmd>,
}

impl Default for ActorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorStore {
    pub fn new() -> Self {
        let (tx_cmd, mut rx_cmd) = mpsc::unbounded_channel::<StoreCmd>();

        tokio::spawn(async move {
            let mut state = State::default();

            while let Some(cmd) = rx_cmd.recv().await {
                match cmd {
                    StoreCmd::Create { new, reply } => {
                        let _ = reply.send(state.create(new));
                    }
                    StoreCmd::Get { id, reply } => {
                        let _ = reply.send(state.rows.get(&id).cloned());
                    }
                    StoreCmd::List { reply } => {
                        let _ = reply.send(state.rows.values().cloned().collect());
                    }
                    StoreCmd::RowLock { id, reply } => {
                        let _ = reply.send(state.row_locks.get(&id).cloned());
                    }
                    StoreCmd::Commit { drawdown, reply } => {
                        let _ = reply.send(state.commit(drawdown));
                    }
                    StoreCmd::Reservations { id, reply } => {
                        let entries = state.rows.contains_key(&id).then(|| {
                            state
                                .ledger
                                .iter()
                                .filter(|r| r.resource_id == id)
                                .cloned()
                                .collect()
                        });
                        let _ = reply.send(entries);
                    }
                    StoreCmd::Shutdown => {
                        info!(
                            resources = state.rows.len(),
                            reservations = state.ledger.len(),
                            "store actor stopping"
                        );
                        break;
                    }
                }
            }
            debug!("store actor exited");
        });

        Self { tx_cmd }
    }

    /// Stops the owning task. Later calls fail with [`StoreError::Unavailable`].
    pub fn shutdown(&self) {
        let _ = self.tx_cmd.send(StoreCmd::Shutdown);
    }

    async fn request<T, F>(&self, build: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(Reply<T>) -> StoreCmd,
    {
        // oneshot to get the answer back from the store task
        let (tx, rx) = oneshot::channel();
        self.tx_cmd
            .send(build(tx))
            .map_err(|_| StoreError::Unavailable("store actor has stopped".to_string()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("store actor dropped the request".to_string()))
    }
}

#[async_trait]
impl ResourceStore for ActorStore {
    async fn create(&self, new: NewResource) -> Result<Resource, StoreError> {
        self.request(|reply| StoreCmd::Create { new, reply }).await?
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError> {
        self.request(|reply| StoreCmd::Get { id, reply }).await
    }

    async fn list(&self) -> Result<Vec<Resource>, StoreError> {
        self.request(|reply| StoreCmd::List { reply }).await
    }

    async fn lock(&self, id: ResourceId, wait: Duration) -> Result<RowLock, StoreError> {
        let row_lock = self
            .request(|reply| StoreCmd::RowLock { id, reply })
            .await?
            .ok_or(StoreError::NotFound(id))?;
        let guard = timeout(wait, row_lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(id))?;
        Ok(RowLock::new(id, guard))
    }

    async fn commit(&self, drawdown: Drawdown) -> Result<(Resource, Reservation), StoreError> {
        self.request(|reply| StoreCmd::Commit { drawdown, reply })
            .await?
    }

    async fn reservations(&self, id: ResourceId) -> Result<Vec<Reservation>, StoreError> {
        self.request(|reply| StoreCmd::Reservations { id, reply })
            .await?
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reservation::NewReservation;

    #[tokio::test]
    async fn test_actor_store() {
        let store = ActorStore::new();
        let mut handles = Vec::new();

        // concurrent creators
        for i in 0..5 {
            let store = store.clone();
            let handle = tokio::spawn(async move {
                for j in 0..5 {
                    store
                        .create(NewResource::new(format!("{i}: {j}"), "", 10))
                        .await
                        .unwrap();
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 25);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let first = &all[0];
        let (updated, reservation) = store
            .commit(Drawdown {
                expected_version: first.version,
                remaining: 7,
                reservation: NewReservation {
                    resource_id: first.id,
                    quantity: 3,
                    requester: "user1".into(),
                },
            })
            .await
            .unwrap();
        assert_eq!(updated.available_capacity, 7);
        assert_eq!(reservation.id, 1);
        assert_eq!(store.reservations(first.id).await.unwrap(), vec![reservation]);
        assert!(store.reservations(all[1].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_actor_store_shutdown() {
        let store = ActorStore::new();
        let r = store.create(NewResource::new("Gone", "", 5)).await.unwrap();
        store.shutdown();

        assert!(matches!(store.get(r.id).await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.lock(r.id, Duration::from_millis(10)).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
