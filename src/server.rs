use crate::{
    app_state::AppState,
    error::AppError,
    handlers::{
        handle_book, handle_get_resource, handle_health, handle_list_resources,
        handle_reservations,
    },
    store::store::ResourceStore,
};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router<S: ResourceStore>(state: AppState<S>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/tickets/{id}/book", post(handle_book::<S>))
        .route("/api/tickets/{id}", get(handle_get_resource::<S>))
        .route("/api/tickets/{id}/reservations", get(handle_reservations::<S>))
        .route("/api/events", get(handle_list_resources::<S>))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::AxumServe(e.to_string()))?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::AxumServe(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}
