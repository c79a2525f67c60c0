//! The static model registry (C1, §4.1).
//!
//! A compile-time `alias → ModelSpec` table plus the three-step lookup
//! rule: exact alias, engine-qualified prefix synthesis, or `UnknownModel`.
//! Extending the set of selectable models means editing [`ENTRIES`], never
//! the scheduler or admission validator.

use stt_gateway_core::{AdmissionError, EngineCapabilities, EngineKind, ModelSpec};

/// The compiled-in registry. Order is insertion order; lookup is linear
/// since the table is small and rebuilt only at compile time.
fn entries() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            alias: "paraformer".to_string(),
            engine_kind: EngineKind::Funasr,
            model_id: "iic/paraformer-zh".to_string(),
            description: "FunASR Paraformer, Mandarin, speaker diarization + timestamps"
                .to_string(),
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: true,
                emotion_tags: false,
                language_detect: false,
            },
        },
        ModelSpec {
            alias: "paraformer-emotion".to_string(),
            engine_kind: EngineKind::Funasr,
            model_id: "iic/emotion2vec_plus_large".to_string(),
            description: "FunASR Paraformer variant with emotion tagging".to_string(),
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: true,
                emotion_tags: true,
                language_detect: false,
            },
        },
        ModelSpec {
            alias: "qwen3-asr-mini".to_string(),
            engine_kind: EngineKind::Mlx,
            model_id: "mlx-community/Qwen3-ASR-mini".to_string(),
            description: "Qwen3 ASR mini, served locally via MLX on Apple Silicon".to_string(),
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: false,
                emotion_tags: false,
                language_detect: true,
            },
        },
        ModelSpec {
            alias: "whisper-large-v3".to_string(),
            engine_kind: EngineKind::Mlx,
            model_id: "mlx-community/whisper-large-v3-mlx".to_string(),
            description: "OpenAI Whisper large-v3, served locally via MLX".to_string(),
            capabilities: EngineCapabilities {
                timestamp: true,
                diarization: false,
                emotion_tags: false,
                language_detect: true,
            },
        },
    ]
}

/// OpenAI's default placeholder model id, and the empty/absent forms — none
/// of these select a model; all three mean "keep current" (§4.1).
pub fn is_passthrough(requested: Option<&str>) -> bool {
    matches!(requested, None | Some("") | Some("whisper-1"))
}

/// Resolve a requested model string to a [`ModelSpec`] per the three-step
/// rule in §4.1. Callers must check [`is_passthrough`] first — this
/// function always tries to resolve `requested` to *some* spec.
pub fn resolve(requested: &str) -> Result<ModelSpec, AdmissionError> {
    if let Some(spec) = entries().into_iter().find(|s| s.alias == requested) {
        return Ok(spec);
    }

    if let Some(kind) = engine_kind_for_prefix(requested) {
        return Ok(ModelSpec {
            alias: requested.to_string(),
            engine_kind: kind,
            model_id: requested.to_string(),
            description: format!("off-registry {} model", kind_label(kind)),
            capabilities: EngineCapabilities::conservative(),
        });
    }

    Err(AdmissionError::UnknownModel {
        requested: requested.to_string(),
    })
}

/// All compiled-in registry entries, for `GET /v1/models`.
pub fn all() -> Vec<ModelSpec> {
    entries()
}

fn engine_kind_for_prefix(requested: &str) -> Option<EngineKind> {
    [EngineKind::Funasr, EngineKind::Mlx]
        .into_iter()
        .find(|kind| requested.starts_with(kind.prefix()))
}

fn kind_label(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::Funasr => "funasr",
        EngineKind::Mlx => "mlx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_alias_match_returns_its_spec() {
        let spec = resolve("paraformer").expect("known alias");
        assert_eq!(spec.engine_kind, EngineKind::Funasr);
        assert_eq!(spec.model_id, "iic/paraformer-zh");
        assert!(spec.capabilities.diarization);
    }

    #[test]
    fn engine_qualified_prefix_synthesizes_conservative_capabilities() {
        let spec = resolve("mlx-community/some-new-model").expect("prefix match");
        assert_eq!(spec.engine_kind, EngineKind::Mlx);
        assert_eq!(spec.model_id, "mlx-community/some-new-model");
        assert_eq!(spec.capabilities, EngineCapabilities::conservative());
    }

    #[test]
    fn unrecognized_string_is_unknown_model() {
        let err = resolve("totally-made-up").unwrap_err();
        assert!(matches!(err, AdmissionError::UnknownModel { .. }));
    }

    #[test]
    fn passthrough_forms_are_recognized() {
        assert!(is_passthrough(None));
        assert!(is_passthrough(Some("")));
        assert!(is_passthrough(Some("whisper-1")));
        assert!(!is_passthrough(Some("paraformer")));
    }

    #[test]
    fn all_aliases_are_unique() {
        let specs = all();
        let mut aliases: Vec<&str> = specs.iter().map(|s| s.alias.as_str()).collect();
        aliases.sort_unstable();
        let mut deduped = aliases.clone();
        deduped.dedup();
        assert_eq!(aliases.len(), deduped.len());
    }
}
