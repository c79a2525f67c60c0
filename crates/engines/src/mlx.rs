//! Subprocess-delegation adapter: MLX models run through a CLI binary
//! invoked per call, since MLX (Apple Silicon) inference has no long-lived
//! server story in this deployment the way the FunASR sidecar does.
//!
//! `load`/`release` are no-ops at the process level — the MLX CLI loads
//! weights fresh on every invocation — but both still observe the
//! hot-swap contract so the scheduler's call-order invariant (§4.6) holds
//! regardless of which engine kind is active.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use stt_gateway_core::{
    EngineCapabilities, EngineError, EngineKind, RawSegment, Segment, TranscriptionOptions,
    TranscriptionResult,
};

use crate::Engine;

pub struct MlxEngine {
    model_id: String,
    binary_path: PathBuf,
    capabilities: EngineCapabilities,
}

impl MlxEngine {
    pub fn new(model_id: String, binary_path: PathBuf) -> Self {
        Self {
            model_id,
            binary_path,
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: false,
                emotion_tags: false,
                language_detect: true,
            },
        }
    }
}

#[derive(Deserialize)]
struct MlxSegment {
    id: u32,
    start: Option<f64>,
    end: Option<f64>,
    text: String,
}

#[derive(Deserialize)]
struct MlxCliOutput {
    text: String,
    duration: f64,
    language: String,
    #[serde(default)]
    segments: Vec<MlxSegment>,
}

impl Engine for MlxEngine {
    fn load(&mut self) -> Result<(), EngineError> {
        let output = Command::new(&self.binary_path)
            .args(["--check-model", &self.model_id])
            .output()
            .map_err(|e| EngineError::LoadFailed {
                model_id: self.model_id.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::LoadFailed {
                model_id: self.model_id.clone(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn transcribe(
        &mut self,
        path: &Path,
        opts: TranscriptionOptions,
    ) -> Result<TranscriptionResult, EngineError> {
        if file_is_empty(path, &self.model_id)? {
            return Ok(TranscriptionResult::empty(self.model_id.clone(), opts));
        }

        let output = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.model_id)
            .arg("--audio")
            .arg(path)
            .arg("--language")
            .arg(language_arg(opts.language))
            .args(opts.with_timestamp.then_some("--with-timestamp"))
            .arg("--output")
            .arg("json")
            .output()
            .map_err(|e| EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let parsed: MlxCliOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: format!("malformed CLI output: {e}"),
            }
        })?;

        let raw_segments: Vec<RawSegment> = parsed
            .segments
            .into_iter()
            .map(|s| RawSegment {
                id: s.id,
                speaker: None,
                start: s.start,
                end: s.end,
                text: s.text,
            })
            .collect();

        let segments = opts
            .with_timestamp
            .then(|| Segment::sanitize(raw_segments));

        Ok(TranscriptionResult {
            text: parsed.text,
            duration: parsed.duration,
            language: parsed.language,
            model_id: self.model_id.clone(),
            segments,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn engine_kind(&self) -> EngineKind {
        EngineKind::Mlx
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }
}

fn language_arg(language: stt_gateway_core::Language) -> &'static str {
    language.as_str()
}

/// §9 open question: empty audio returns `{text: "", segments: []}` with no
/// error, rather than invoking the CLI at all.
fn file_is_empty(path: &Path, model_id: &str) -> Result<bool, EngineError> {
    let metadata = std::fs::metadata(path).map_err(|e| EngineError::InferenceFailed {
        model_id: model_id.to_string(),
        reason: format!("failed to stat audio file: {e}"),
    })?;
    Ok(metadata.len() == 0)
}
