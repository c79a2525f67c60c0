//! The HTTP-facing composite error (§7). Lives here rather than in
//! `stt-gateway-core` because mapping onto `axum::response::IntoResponse`
//! requires both the trait and `GatewayError` to be local to one crate —
//! neither holds if this type lived in `core` (orphan rule).
//!
//! Grounded on the `thiserror` + `#[serde(tag = "error")]` +
//! `impl IntoResponse` pattern in the edgen `openai_shim.rs` transcription
//! error enum, and the `RpcError::code()` taxonomy in the tron sidecar
//! transcription handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use stt_gateway_core::{AdmissionError, EngineError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error("request queue is full")]
    QueueFull,

    #[error("service is degraded: {0}")]
    ServiceDegraded(String),

    #[error("engine failed during hot-swap: {0}")]
    SwapFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("multipart body is malformed: {0}")]
    BadMultipart(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<Uuid>,
}

impl GatewayError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::Admission(AdmissionError::UnsupportedMediaType { .. }) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedMediaType")
            }
            GatewayError::Admission(AdmissionError::PayloadTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge")
            }
            GatewayError::Admission(AdmissionError::UnknownModel { .. }) => {
                (StatusCode::BAD_REQUEST, "UnknownModel")
            }
            GatewayError::Admission(AdmissionError::CapabilityMismatch(_)) => {
                (StatusCode::BAD_REQUEST, "CapabilityMismatch")
            }
            GatewayError::Admission(AdmissionError::BadParameter { .. }) => {
                (StatusCode::BAD_REQUEST, "BadParameter")
            }
            GatewayError::BadMultipart(_) => (StatusCode::BAD_REQUEST, "BadParameter"),
            GatewayError::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "QueueFull"),
            GatewayError::ServiceDegraded(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ServiceDegraded")
            }
            GatewayError::SwapFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SwapFailed"),
            GatewayError::Engine(EngineError::InferenceFailed { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EngineInferenceFailed")
            }
            GatewayError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        }
    }

    /// Build the client-visible response, attaching `request_id` on every
    /// `500` per §7 — never a path, stack trace, or back-end message.
    pub fn into_response_with_request_id(self, request_id: Uuid) -> Response {
        let (status, kind) = self.status_and_kind();
        tracing::warn!(%request_id, error = %self, kind, status = status.as_u16(), "request failed");

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let request_id = (status == StatusCode::INTERNAL_SERVER_ERROR).then_some(request_id);

        (
            status,
            Json(ErrorBody {
                error: kind.to_string(),
                message,
                request_id,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.into_response_with_request_id(Uuid::new_v4())
    }
}
