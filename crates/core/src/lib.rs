//! Domain types, error taxonomy, and the `Engine` contract shared by every
//! crate in the STT gateway.
//!
//! This crate is intentionally framework-agnostic: it knows nothing about
//! Axum, multipart parsing, or HTTP status codes. Those concerns live in
//! `stt-gateway-server`, which maps the error types defined here onto the
//! wire.

mod domain;
mod engine;
mod error;
mod job;

pub use domain::{
    EngineCapabilities, EngineKind, Language, ModelSpec, OutputFormat, RawSegment, Segment,
    TranscriptionOptions, TranscriptionResult,
};
pub use engine::Engine;
pub use error::{AdmissionError, EngineError, RequiredCapability};
pub use job::{JobOutcome, TranscriptionJob, TranscriptionRequest};
