//! Sidecar-delegation adapter: FunASR models are served by a long-lived
//! local HTTP process, and this adapter is a thin client over it.
//!
//! Grounded on the sidecar-over-`reqwest::multipart` pattern used for
//! transcription delegation across the corpus, generalized from an async
//! call site to a blocking one since [`Engine`] is synchronous by design
//! (§5): the scheduler already runs this on a dedicated worker thread, so
//! there is no async runtime to yield to here.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use stt_gateway_core::{
    EngineCapabilities, EngineError, EngineKind, RawSegment, Segment, TranscriptionOptions,
    TranscriptionResult,
};

use crate::Engine;

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(300);

pub struct FunasrEngine {
    model_id: String,
    sidecar_url: String,
    client: reqwest::blocking::Client,
    capabilities: EngineCapabilities,
    loaded: bool,
}

impl FunasrEngine {
    pub fn new(model_id: String, sidecar_url: String) -> Self {
        Self {
            model_id,
            sidecar_url,
            client: reqwest::blocking::Client::new(),
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: true,
                emotion_tags: false,
                language_detect: false,
            },
            loaded: false,
        }
    }
}

#[derive(Deserialize)]
struct SidecarSegment {
    id: u32,
    speaker: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
    text: String,
}

#[derive(Deserialize)]
struct SidecarTranscribeResponse {
    text: String,
    duration: f64,
    language: String,
    #[serde(default)]
    segments: Vec<SidecarSegment>,
}

impl Engine for FunasrEngine {
    fn load(&mut self) -> Result<(), EngineError> {
        let response = self
            .client
            .post(format!("{}/model/load", self.sidecar_url))
            .timeout(LOAD_TIMEOUT)
            .json(&serde_json::json!({ "model_id": self.model_id }))
            .send()
            .map_err(|e| EngineError::LoadFailed {
                model_id: self.model_id.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EngineError::LoadFailed {
                model_id: self.model_id.clone(),
                reason: format!("sidecar returned {}", response.status()),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineError> {
        if !self.loaded {
            return Ok(());
        }
        let response = self
            .client
            .post(format!("{}/model/release", self.sidecar_url))
            .timeout(LOAD_TIMEOUT)
            .send()
            .map_err(|e| EngineError::ReleaseFailed {
                model_id: self.model_id.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EngineError::ReleaseFailed {
                model_id: self.model_id.clone(),
                reason: format!("sidecar returned {}", response.status()),
            });
        }
        self.loaded = false;
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

        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .map_err(|e| EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: format!("failed to attach audio file: {e}"),
            })?
            .text("language", language_param(opts.language))
            .text("with_timestamp", opts.with_timestamp.to_string());

        let response = self
            .client
            .post(format!("{}/transcribe", self.sidecar_url))
            .timeout(TRANSCRIBE_TIMEOUT)
            .multipart(form)
            .send()
            .map_err(|e| EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: format!("sidecar returned {}", response.status()),
            });
        }

        let body: SidecarTranscribeResponse =
            response.json().map_err(|e| EngineError::InferenceFailed {
                model_id: self.model_id.clone(),
                reason: format!("malformed sidecar response: {e}"),
            })?;

        let raw_segments: Vec<RawSegment> = body
            .segments
            .into_iter()
            .map(|s| RawSegment {
                id: s.id,
                speaker: s.speaker,
                start: s.start,
                end: s.end,
                text: s.text,
            })
            .collect();

        let segments = opts
            .with_timestamp
            .then(|| Segment::sanitize(raw_segments));

        Ok(TranscriptionResult {
            text: body.text,
            duration: body.duration,
            language: body.language,
            model_id: self.model_id.clone(),
            segments,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn engine_kind(&self) -> EngineKind {
        EngineKind::Funasr
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }
}

fn language_param(language: stt_gateway_core::Language) -> &'static str {
    language.as_str()
}

/// §9 open question: empty audio returns `{text: "", segments: []}` with
/// no error, rather than dispatching to the sidecar at all.
fn file_is_empty(path: &Path, model_id: &str) -> Result<bool, EngineError> {
    let metadata = std::fs::metadata(path).map_err(|e| EngineError::InferenceFailed {
        model_id: model_id.to_string(),
        reason: format!("failed to stat audio file: {e}"),
    })?;
    Ok(metadata.len() == 0)
}
