use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pendulum_shared::protocol::{ErrorResponse, QueryReply};
use pendulum_shared::ParamError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the coordinator and the registry.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid pendulum: {0}")]
    Validation(#[from] ParamError),

    /// Body missing, not JSON, or with a field of the wrong type.
    #[error("invalid request body: {0}")]
    MalformedBody(String),

    #[error("invalid pendulum id")]
    InvalidId,

    #[error("pendulum {0} not found")]
    NotFound(String),

    /// The record existed when the query arrived but was gone after the collision pass.
    #[error("pendulum {0} vanished during the collision pass")]
    Vanished(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Line sent back on the query channel. The channel stays open afterwards.
    pub fn to_reply(&self) -> QueryReply {
        match self {
            CoreError::InvalidId | CoreError::Validation(_) | CoreError::MalformedBody(_) => {
                QueryReply::InvalidId
            }
            CoreError::NotFound(_) => QueryReply::NotFound,
            CoreError::Vanished(_) => QueryReply::Vanished,
            CoreError::Store(_) => QueryReply::Unavailable,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) | CoreError::MalformedBody(_) | CoreError::InvalidId => {
                StatusCode::BAD_REQUEST
            }
            CoreError::NotFound(_) | CoreError::Vanished(_) => StatusCode::NOT_FOUND,
            CoreError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        CoreError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            CoreError::NotFound(_) | CoreError::Vanished(_) => "Pendulum not found".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}
