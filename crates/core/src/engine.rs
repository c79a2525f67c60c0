//! The polymorphic back-end contract (C3).
//!
//! Generalized from the teacher's `SttBackend` trait
//! (`process_chunk`/`finalize`/`reset`) into a load/transcribe/release
//! life-cycle: our engines are not streaming, but they do carry real
//! memory-resident state across calls, which `SttBackend` did not model.

use std::path::Path;

use crate::domain::{EngineCapabilities, EngineKind, TranscriptionOptions, TranscriptionResult};
use crate::error::EngineError;

/// Uniform contract over ASR back-ends.
///
/// Engines are **single-threaded**: the scheduler is the only caller, and
/// it never invokes `transcribe` from more than one thread at a time.
/// Every method is synchronous on purpose — the scheduler runs the whole
/// consumer loop on a dedicated worker thread so a multi-second `load` or
/// `transcribe` call never blocks the async HTTP runtime.
pub trait Engine: Send {
    /// Bring the model into memory. May take tens of seconds. Idempotent
    /// on success: calling `load` twice on an already-loaded engine must
    /// not re-allocate.
    fn load(&mut self) -> Result<(), EngineError>;

    /// Free all accelerator memory. Must complete in bounded time. Errors
    /// are the caller's to log and swallow — release never aborts a swap.
    fn release(&mut self) -> Result<(), EngineError>;

    /// Run inference over the audio at `path`. `path` is valid only for
    /// the duration of this call; the scheduler deletes it afterward.
    fn transcribe(
        &mut self,
        path: &Path,
        opts: TranscriptionOptions,
    ) -> Result<TranscriptionResult, EngineError>;

    fn model_id(&self) -> &str;
    fn engine_kind(&self) -> EngineKind;
    fn capabilities(&self) -> EngineCapabilities;
}
