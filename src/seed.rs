use crate::{
    error::StoreError,
    resource::{NewResource, Resource},
    store::store::ResourceStore,
};
use tracing::info;

pub fn sample_events() -> Vec<NewResource> {
    vec![
        NewResource::new(
            "Spring Boot Conference 2025",
            "Annual Spring Boot developer conference",
            100,
        ),
        NewResource::new("Angular Workshop", "Full-day Angular hands-on workshop", 50),
        NewResource::new("Java 21 Masterclass", "Deep dive into Java 21 features", 75),
        NewResource::new(
            "Microservices Summit",
            "Learn about microservices architecture",
            120,
        ),
        NewResource::new(
            "Cloud Native Conference",
            "Cloud-native technologies and best practices",
            200,
        ),
    ]
}

/// One-time startup load of the sample events.
pub async fn seed_sample_events<S: ResourceStore>(store: &S) -> Result<Vec<Resource>, StoreError> {
    info!("Initializing sample events");
    let mut created = Vec::new();
    for event in sample_events() {
        created.push(store.create(event).await?);
    }
    info!(count = created.len(), "Sample events initialized");
    Ok(created)
}
