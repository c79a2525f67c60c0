//! Error taxonomy (§7). Each variant here names exactly one row of the
//! table in the spec; the HTTP-facing composite (which also folds in
//! queue/scheduler failures) lives in `stt-gateway-server::error` since it
//! needs `axum::response::IntoResponse`, which this crate deliberately
//! does not depend on.

use thiserror::Error;

/// A capability a requested output implies but the current model lacks
/// (§4.2). Carried on [`AdmissionError::CapabilityMismatch`] so the client
/// message can name exactly what's missing, without ever silently
/// downgrading the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredCapability {
    Timestamp,
    Diarization,
}

impl RequiredCapability {
    pub fn as_str(self) -> &'static str {
        match self {
            RequiredCapability::Timestamp => "timestamp",
            RequiredCapability::Diarization => "diarization",
        }
    }
}

impl std::fmt::Display for RequiredCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the admission validator (C5) before a job is ever
/// enqueued. Maps 1:1 onto the `400`/`413`/`415` rows of §7.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    #[error("payload too large: {size_bytes} bytes exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("unknown model: {requested}")]
    UnknownModel { requested: String },

    #[error("model lacks required capability: {0}")]
    CapabilityMismatch(RequiredCapability),

    #[error("bad request parameter `{field}`: {reason}")]
    BadParameter { field: String, reason: String },
}

/// Failures raised by a concrete [`Engine`](crate::Engine) implementation.
/// Distinguishes a load failure (which may trigger degraded-service
/// recovery in the scheduler) from an inference failure (which never
/// does).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine failed to load model {model_id}: {reason}")]
    LoadFailed { model_id: String, reason: String },

    #[error("engine failed to release model {model_id}: {reason}")]
    ReleaseFailed { model_id: String, reason: String },

    #[error("inference failed for model {model_id}: {reason}")]
    InferenceFailed { model_id: String, reason: String },
}
