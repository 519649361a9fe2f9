use crate::{
    coordinator::{BookingCoordinator, CoordinatorConfig},
    query::QueryService,
    store::store::ResourceStore,
};

#[derive(Clone)]
pub struct AppState<S: ResourceStore> {
    pub coordinator: BookingCoordinator<S>,
    pub queries: QueryService<S>,
}

impl<S: ResourceStore> AppState<S> {
    pub fn new(store: S, config: CoordinatorConfig) -> Self {
        Self {
            queries: QueryService::new(store.clone()),
            coordinator: BookingCoordinator::new(store, config),
        }
    }
}
