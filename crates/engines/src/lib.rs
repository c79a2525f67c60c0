//! Concrete [`Engine`](stt_gateway_core::Engine) back-ends (C3) and the
//! factory that constructs them from a [`ModelSpec`] (C4).
//!
//! Two real adapters mirror the two delegation styles seen across the
//! broader corpus: [`FunasrEngine`] talks to a long-lived local sidecar
//! process over HTTP, [`MlxEngine`] shells out to a CLI per call. Both
//! treat actual inference as an out-of-process collaborator — this crate
//! owns only the load/release/transcribe protocol, not model weights.

mod funasr;
mod mlx;
mod stub;

pub use funasr::FunasrEngine;
pub use mlx::MlxEngine;
pub use stub::StubEngine;

use std::path::PathBuf;

use stt_gateway_core::{Engine, EngineKind, ModelSpec};

/// Construct the concrete engine for `spec`. Does not call
/// [`Engine::load`](stt_gateway_core::Engine::load) — the scheduler decides
/// when loading happens.
pub fn create(
    spec: &ModelSpec,
    funasr_sidecar_url: &str,
    mlx_binary_path: &std::path::Path,
) -> Box<dyn Engine> {
    match spec.engine_kind {
        EngineKind::Funasr => Box::new(FunasrEngine::new(
            spec.model_id.clone(),
            funasr_sidecar_url.to_string(),
        )),
        EngineKind::Mlx => Box::new(MlxEngine::new(
            spec.model_id.clone(),
            PathBuf::from(mlx_binary_path),
        )),
    }
}
