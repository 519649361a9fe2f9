use crate::{
    app_state::AppState,
    error::{AppError, BookingError},
    reservation::{BookingReceipt, Reservation},
    resource::{ResourceId, ResourceView},
    store::store::ResourceStore,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookParams {
    #[serde(alias = "quantity")]
    pub count: i64,
    #[serde(default, alias = "requester")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

fn resource_id(path: Result<Path<ResourceId>, PathRejection>) -> Result<ResourceId, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

pub async fn handle_book<S: ResourceStore>(
    State(state): State<AppState<S>>,
    path: Result<Path<ResourceId>, PathRejection>,
    params: Result<Query<BookParams>, QueryRejection>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let id = resource_id(path)?;
    let Query(params) = params.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let quantity = u32::try_from(params.count)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            BookingError::Validation(format!("Count must be at least 1, got {}", params.count))
        })?;

    let booking = state
        .coordinator
        .book(id, quantity, params.user_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(BookingReceipt::from(booking))))
}

pub async fn handle_get_resource<S: ResourceStore>(
    State(state): State<AppState<S>>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<ResourceView>, AppError> {
    let id = resource_id(path)?;
    let resource = state.queries.get_resource(id).await?;
    Ok(Json(resource.into()))
}

pub async fn handle_list_resources<S: ResourceStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ResourceView>>, AppError> {
    let resources = state.queries.list_resources().await?;
    Ok(Json(resources.into_iter().map(ResourceView::from).collect()))
}

pub async fn handle_reservations<S: ResourceStore>(
    State(state): State<AppState<S>>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let id = resource_id(path)?;
    Ok(Json(state.queries.reservations(id).await?))
}

pub async fn handle_health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}
