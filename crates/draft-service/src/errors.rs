//! Draft service error types.
//!
//! Errors map to HTTP responses through `IntoResponse` and to `error` frames
//! on the realtime channel through [`DraftError::to_event`]. Client-facing
//! messages never carry internal detail; the detail is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use draft_core::protocol::ServerEvent;
use draft_core::RejectReason;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DraftError {
    /// The engine refused the action. Expected under racing input.
    #[error("Action rejected: {0}")]
    Rejected(RejectReason),

    /// Persistence backend unreachable or failing.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Live room limit reached.
    #[error("Room capacity exceeded")]
    CapacityExceeded,

    /// Service is shutting down.
    #[error("Service is draining")]
    Draining,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DraftError {
    /// Stable error code shared by REST bodies and realtime `error` frames.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            DraftError::Rejected(_) => "REJECTED",
            DraftError::Storage(_) => "STORAGE_UNAVAILABLE",
            DraftError::RoomNotFound(_) => "NOT_FOUND",
            DraftError::InvalidRoomCode(_) | DraftError::BadRequest(_) => "BAD_REQUEST",
            DraftError::Conflict(_) => "CONFLICT",
            DraftError::CapacityExceeded | DraftError::Draining => "CAPACITY_EXCEEDED",
            DraftError::Config(_) | DraftError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DraftError::InvalidRoomCode(_) | DraftError::BadRequest(_) => 400,
            DraftError::RoomNotFound(_) => 404,
            DraftError::Conflict(_) => 409,
            DraftError::Rejected(_) => 422,
            DraftError::Storage(_) | DraftError::CapacityExceeded | DraftError::Draining => 503,
            DraftError::Config(_) | DraftError::Internal(_) => 500,
        }
    }

    /// Whether retrying the same request later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DraftError::Storage(_) | DraftError::CapacityExceeded | DraftError::Draining
        )
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            DraftError::Rejected(reason) => reason.to_string(),
            DraftError::Storage(_) => {
                "Room state could not be saved; it will be retried".to_string()
            }
            DraftError::RoomNotFound(_) => "Room not found".to_string(),
            DraftError::InvalidRoomCode(reason)
            | DraftError::BadRequest(reason)
            | DraftError::Conflict(reason) => reason.clone(),
            DraftError::CapacityExceeded => {
                "Server is at capacity, please try again".to_string()
            }
            DraftError::Draining => "Server is shutting down, please reconnect".to_string(),
            DraftError::Config(_) | DraftError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Realtime `error` frame for the connection that caused this error.
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            code: self.error_code().to_string(),
            message: self.client_message(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<RejectReason> for DraftError {
    fn from(reason: RejectReason) -> Self {
        DraftError::Rejected(reason)
    }
}

impl From<redis::RedisError> for DraftError {
    fn from(err: redis::RedisError) -> Self {
        DraftError::Storage(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for DraftError {
    fn into_response(self) -> Response {
        match &self {
            DraftError::Storage(err) => {
                tracing::warn!(target: "draft.repository", error = %err, "Storage operation failed");
            }
            DraftError::Config(err) | DraftError::Internal(err) => {
                tracing::error!(target: "draft.service", error = %err, "Request failed");
            }
            _ => {}
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.client_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DraftError::Rejected(RejectReason::WrongTurn).to_string(),
            "Action rejected: not this side's turn or action"
        );
        assert_eq!(
            DraftError::Storage("connection refused".to_string()).to_string(),
            "Storage error: connection refused"
        );
        assert_eq!(DraftError::CapacityExceeded.to_string(), "Room capacity exceeded");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DraftError::InvalidRoomCode("x".to_string()).status_code(), 400);
        assert_eq!(DraftError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(DraftError::RoomNotFound("x".to_string()).status_code(), 404);
        assert_eq!(DraftError::Conflict("x".to_string()).status_code(), 409);
        assert_eq!(
            DraftError::Rejected(RejectReason::AlreadyTaken).status_code(),
            422
        );
        assert_eq!(DraftError::Storage("x".to_string()).status_code(), 503);
        assert_eq!(DraftError::CapacityExceeded.status_code(), 503);
        assert_eq!(DraftError::Draining.status_code(), 503);
        assert_eq!(DraftError::Internal("x".to_string()).status_code(), 500);
        assert_eq!(DraftError::Config("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_retryable() {
        assert!(DraftError::Storage("x".to_string()).is_retryable());
        assert!(DraftError::Draining.is_retryable());
        assert!(DraftError::CapacityExceeded.is_retryable());
        assert!(!DraftError::Rejected(RejectReason::DraftComplete).is_retryable());
        assert!(!DraftError::RoomNotFound("x".to_string()).is_retryable());
    }

    #[test]
    fn test_client_message_hides_internal_detail() {
        let error = DraftError::Storage("redis://secret@host refused".to_string());
        assert!(!error.client_message().contains("redis://"));

        let error = DraftError::Internal("channel send failed".to_string());
        assert_eq!(error.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_to_event() {
        let event = DraftError::Storage("down".to_string()).to_event();
        assert!(matches!(
            event,
            ServerEvent::Error { ref code, retryable: true, .. } if code == "STORAGE_UNAVAILABLE"
        ));

        let event = DraftError::Conflict("Seat left is already taken".to_string()).to_event();
        assert!(matches!(
            event,
            ServerEvent::Error { ref code, retryable: false, .. } if code == "CONFLICT"
        ));
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = DraftError::RoomNotFound("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Room not found");
    }

    #[tokio::test]
    async fn test_into_response_storage() {
        let response = DraftError::Storage("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "STORAGE_UNAVAILABLE");
        assert!(!body_json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("timeout"));
    }

    #[tokio::test]
    async fn test_into_response_rejected() {
        let response = DraftError::Rejected(RejectReason::WrongTurn).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "REJECTED");
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response = DraftError::InvalidRoomCode("room code is empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(body_json["error"]["message"], "room code is empty");
    }
}
