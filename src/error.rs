use crate::resource::ResourceId;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("resource {0} does not exist")]
    NotFound(ResourceId),

    #[error("resource {resource_id} changed: expected version {expected}, found {actual}")]
    Conflict {
        resource_id: ResourceId,
        expected: u64,
        actual: u64,
    },

    #[error("timed out waiting for the lock on resource {0}")]
    LockTimeout(ResourceId),

    #[error("invalid resource: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InsufficientCapacity,
    InvalidRequest,
    TemporarilyUnavailable,
    Persistence,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("resource not found with id: {0}")]
    NotFound(ResourceId),

    #[error(
        "not enough capacity on resource {resource_id}. Requested: {requested}, Available: {available}"
    )]
    InsufficientCapacity {
        resource_id: ResourceId,
        requested: u32,
        available: u32,
    },

    #[error("resource {resource_id} is temporarily unavailable: {reason}")]
    TemporarilyUnavailable {
        resource_id: ResourceId,
        reason: String,
    },

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation(_) => ErrorKind::InvalidRequest,
            BookingError::NotFound(_) => ErrorKind::NotFound,
            BookingError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            BookingError::TemporarilyUnavailable { .. } => ErrorKind::TemporarilyUnavailable,
            BookingError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

/// Conflicts are retried by the coordinator and must be handled before this
/// conversion; one that slips through is reported as transient.
impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => BookingError::NotFound(id),
            StoreError::LockTimeout(id) => BookingError::TemporarilyUnavailable {
                resource_id: id,
                reason: e.to_string(),
            },
            StoreError::Conflict { resource_id, .. } => BookingError::TemporarilyUnavailable {
                resource_id,
                reason: e.to_string(),
            },
            StoreError::Invalid(msg) => BookingError::Validation(msg),
            StoreError::Unavailable(_) => BookingError::Persistence(e.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Axum serve error: {0}")]
    AxumServe(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::AxumServe(_) | AppError::Config(_) => ErrorKind::Internal,
            AppError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AppError::Booking(e) => e.kind(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: &'static str,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match kind {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Resource Not Found"),
            ErrorKind::InsufficientCapacity => (StatusCode::CONFLICT, "Insufficient Capacity"),
            ErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "Validation Error"),
            ErrorKind::TemporarilyUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Temporarily Unavailable")
            }
            ErrorKind::Persistence => (StatusCode::INTERNAL_SERVER_ERROR, "Persistence Error"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };

        let body = ErrorBody {
            kind,
            message,
            detail: self.to_string(),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}
