//! A validated request bound to a temp file and a completion channel
//! (§3 `TranscriptionRequest`/`TranscriptionJob`).
//!
//! `TranscriptionJob` itself doesn't know about channels — that's a detail
//! of how `stt-gateway-server::scheduler` wires up completion, since the
//! channel type is an async-runtime concern this crate stays free of.
//! What's fixed here is the invariant: a job owns exactly one temp file,
//! and exactly one of (result, error) is produced for it.

use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::{Language, OutputFormat, TranscriptionResult};
use crate::error::EngineError;

/// A fully-validated request, constructed by admission after every §4.5
/// check has passed.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub request_id: Uuid,
    pub temp_audio_path: PathBuf,
    pub language: Language,
    pub output_format: OutputFormat,
    pub with_timestamp: bool,
    /// `None` means "keep current" — already resolved from the `""` /
    /// `"whisper-1"` / absent passthrough forms by admission.
    pub requested_model: Option<String>,
}

/// Exactly one of these is produced per job, regardless of which path it
/// took through the consumer loop (§3 invariant).
#[derive(Debug)]
pub enum JobOutcome {
    Success(TranscriptionResult),
    Failure(EngineError),
    /// The hot-swap this job triggered failed to load the requested model;
    /// the scheduler attempted (and either succeeded or also failed) to
    /// reload the prior model. Maps to `500` per §7 — this job observed
    /// the failure directly, as opposed to [`JobOutcome::ServiceDegraded`]
    /// below.
    SwapFailed { message: String },
    /// The scheduler was already `Degraded` when this job was dequeued:
    /// a prior job's swap failed and recovery also failed. This job never
    /// touched the engine. Maps to `503` per §7.
    ServiceDegraded { message: String },
}

/// A request paired with the audio file it owns for the lifetime of one
/// trip through the scheduler.
#[derive(Debug)]
pub struct TranscriptionJob {
    pub request: TranscriptionRequest,
}

impl TranscriptionJob {
    pub fn new(request: TranscriptionRequest) -> Self {
        Self { request }
    }
}
