//! API error types with HTTP response mapping.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use engine::{EngineError, ErrorKind};
use projections::ProjectionError;
use serde_json::{Value, json};

/// API-level error type that maps to HTTP responses.
///
/// Every response carries `{ "error": kind, "message": ..., "details": {...} }`.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be parsed (bad id, unknown enum value).
    BadRequest(String),
    /// A read found nothing under the requested id.
    NotFound { entity: &'static str, id: String },
    Engine(EngineError),
    Internal(String),
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApiError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

fn engine_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::InvalidTransition | ErrorKind::InsufficientStock => {
            StatusCode::CONFLICT
        }
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn engine_details(err: &EngineError) -> Value {
    match err {
        EngineError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
        EngineError::Conflict { entity, id, reason } => {
            json!({ "entity": entity, "id": id, "reason": reason })
        }
        EngineError::InsufficientStock {
            product_id,
            requested,
            available,
        } => json!({
            "product_id": product_id,
            "requested": requested,
            "available": available,
        }),
        EngineError::Unauthorized { party, .. } => json!({ "party": party }),
        EngineError::InvalidTransition { entity, from, to } => {
            json!({ "entity": entity, "from": from, "to": to })
        }
        EngineError::Validation { .. } | EngineError::Unavailable { .. } => json!({}),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, json!({})),
            ApiError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound.as_str(),
                format!("{entity} {id} not found"),
                json!({ "entity": entity, "id": id }),
            ),
            ApiError::Engine(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Unavailable {
                    tracing::warn!(error = %err, "storage unavailable");
                }
                (
                    engine_status(kind),
                    kind.as_str(),
                    err.to_string(),
                    engine_details(&err),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    msg,
                    json!({}),
                )
            }
        };

        let body = json!({ "error": kind, "message": message, "details": details });
        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::EventStore(store_err) => ApiError::Engine(store_err.into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
