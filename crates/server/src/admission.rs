//! The Admission Validator (C5, §4.5).
//!
//! An ordered chain of checks, first-failing-check-wins, grounded on the
//! "settings check → enabled check → size check" ordering of
//! `transcribe_audio_via_sidecar` in the tron sidecar transcription
//! handler. Every failure path here runs before a temp file is ever
//! persisted, except the content-length check (persisted-size check
//! happens after the multipart body is streamed to disk, per §4.5 —
//! "without reading the body into memory").

use stt_gateway_core::{AdmissionError, EngineCapabilities, OutputFormat, RequiredCapability};

/// Media types accepted at the HTTP boundary (§4.5 step 2).
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/mpeg",
    "audio/mp3",
    "audio/mp4",
    "audio/x-m4a",
    "audio/flac",
    "audio/ogg",
    "audio/webm",
];

pub fn check_media_type(content_type: &str) -> Result<(), AdmissionError> {
    let base = content_type.split(';').next().unwrap_or(content_type).trim();
    if ALLOWED_CONTENT_TYPES.contains(&base) {
        Ok(())
    } else {
        Err(AdmissionError::UnsupportedMediaType {
            content_type: content_type.to_string(),
        })
    }
}

pub fn check_upload_size(size_bytes: u64, limit_bytes: u64) -> Result<(), AdmissionError> {
    if size_bytes > limit_bytes {
        Err(AdmissionError::PayloadTooLarge {
            size_bytes,
            limit_bytes,
        })
    } else {
        Ok(())
    }
}

/// Format ↔ capability compatibility (§4.2, §4.5 step 5). `capabilities`
/// is the spec that will be active once this request's model (if any) is
/// loaded — the current model's, when `requested_model` is a passthrough.
///
/// Never silently downgrades: a mismatch is always a `400`.
pub fn check_format_capability(
    output_format: OutputFormat,
    with_timestamp: bool,
    capabilities: EngineCapabilities,
) -> Result<(), AdmissionError> {
    let needs_timestamp = matches!(output_format, OutputFormat::Srt) || with_timestamp;
    if needs_timestamp && !capabilities.timestamp {
        return Err(AdmissionError::CapabilityMismatch(
            RequiredCapability::Timestamp,
        ));
    }
    Ok(())
}
