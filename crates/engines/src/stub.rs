//! A deterministic, instrumented [`Engine`] used by scheduler tests (§8).
//!
//! Records the order of `load`/`release`/`transcribe` calls so a test can
//! assert the hot-swap protocol's "release before load" invariant (S4)
//! without spinning up a real sidecar or subprocess.

use std::path::Path;
use std::sync::{Arc, Mutex};

use stt_gateway_core::{
    EngineCapabilities, EngineError, EngineKind, TranscriptionOptions, TranscriptionResult,
};

use crate::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubCall {
    Load,
    Release,
    Transcribe,
}

pub struct StubEngine {
    model_id: String,
    engine_kind: EngineKind,
    capabilities: EngineCapabilities,
    calls: Arc<Mutex<Vec<StubCall>>>,
    fail_load: bool,
    fail_transcribe: bool,
}

impl StubEngine {
    pub fn new(model_id: impl Into<String>, engine_kind: EngineKind) -> Self {
        Self {
            model_id: model_id.into(),
            engine_kind,
            capabilities: EngineCapabilities::conservative(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_load: false,
            fail_transcribe: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: EngineCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_transcribe(mut self) -> Self {
        self.fail_transcribe = true;
        self
    }

    /// A shared handle into this engine's call log, so a test can inspect
    /// it after the engine has been moved into a `Box<dyn Engine>`.
    pub fn call_log(&self) -> Arc<Mutex<Vec<StubCall>>> {
        Arc::clone(&self.calls)
    }
}

impl Engine for StubEngine {
    fn load(&mut self) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(StubCall::Load);
        if self.fail_load {
            return Err(EngineError::LoadFailed {
                model_id: self.model_id.clone(),
                reason: "stub configured to fail load".to_string(),
            });
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(StubCall::Release);
        Ok(())
    }

    fn transcribe(
        &mut self,
        _path: &Path,
        _opts: TranscriptionOptions,
    ) -> Result<TranscriptionResult, EngineError> {
        self.calls.lock().unwrap().push(StubCall::Transcribe);
        if self.fail_transcribe {
            return Err(EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: "stub configured to fail transcribe".to_string(),
            });
        }
        Ok(TranscriptionResult {
            text: "stub transcription".to_string(),
            duration: 1.0,
            language: "en".to_string(),
            model_id: self.model_id.clone(),
            segments: None,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn engine_kind(&self) -> EngineKind {
        self.engine_kind
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }
}
