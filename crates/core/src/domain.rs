//! Plain domain data: model specs, capabilities, transcription results.
//!
//! Mirrors the "frozen value + tagged enum" shape used throughout the
//! broader codebase's domain layer — no behavior lives here beyond small
//! accessors.

use serde::{Deserialize, Serialize};

/// Which concrete back-end a [`ModelSpec`] is served by.
///
/// Extensible: a new back-end is added by extending this enum and wiring a
/// matching arm into the engine factory, not by touching the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Funasr,
    Mlx,
}

impl EngineKind {
    /// The alias prefix that identifies a free-form (off-registry) model
    /// identifier as belonging to this engine, e.g. `"iic/paraformer-zh"`.
    pub fn prefix(self) -> &'static str {
        match self {
            EngineKind::Funasr => "iic/",
            EngineKind::Mlx => "mlx-community/",
        }
    }
}

/// Declared capabilities of a loaded engine. Frozen once a model is chosen;
/// consulted by admission before a job is ever queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCapabilities {
    pub timestamp: bool,
    pub diarization: bool,
    pub emotion_tags: bool,
    pub language_detect: bool,
}

impl EngineCapabilities {
    /// The most conservative capability set: only `timestamp`. Used when
    /// synthesizing a spec for an off-registry, engine-qualified model
    /// identifier (§4.1 rule 2).
    pub const fn conservative() -> Self {
        Self {
            timestamp: true,
            diarization: false,
            emotion_tags: false,
            language_detect: false,
        }
    }
}

/// Immutable, compile-time-known description of one selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Stable short name, unique across the registry (e.g. `"paraformer"`).
    pub alias: String,
    pub engine_kind: EngineKind,
    /// Opaque identifier passed to the back-end (e.g. `"iic/paraformer-zh"`).
    pub model_id: String,
    pub description: String,
    pub capabilities: EngineCapabilities,
}

/// `language` field on a transcription request. The closed set the spec
/// fixes — unknown strings are a validation error, not a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
    Auto,
}

impl Language {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "zh" => Some(Language::Zh),
            "en" => Some(Language::En),
            "auto" | "" => Some(Language::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Auto => "auto",
        }
    }
}

/// `output_format` field, after resolving any `response_format` alias
/// (§6: `verbose_json→json`, `text→txt`, `vtt→srt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Txt,
    Srt,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "json" => Some(OutputFormat::Json),
            "txt" => Some(OutputFormat::Txt),
            "srt" => Some(OutputFormat::Srt),
            _ => None,
        }
    }

    /// Resolve an OpenAI `response_format` alias to our closed
    /// `OutputFormat` set. Returns `None` for unrecognized aliases.
    pub fn from_openai_alias(raw: &str) -> Option<Self> {
        match raw {
            "verbose_json" | "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Txt),
            // `vtt` deliberately aliases to SRT output, matching the
            // original service rather than emitting real WebVTT — see
            // DESIGN.md Open Question decisions.
            "vtt" | "srt" => Some(OutputFormat::Srt),
            _ => None,
        }
    }
}

/// Options passed into [`Engine::transcribe`](crate::Engine::transcribe).
#[derive(Debug, Clone, Copy)]
pub struct TranscriptionOptions {
    pub language: Language,
    pub with_timestamp: bool,
}

/// One labelled span of speech within a [`TranscriptionResult`].
///
/// Times are absolute within the audio. `speaker` is `None` when the engine
/// lacks `diarization`, or when the engine emitted an incomplete segment
/// that was sanitized and reassigned to the fallback speaker `"0"` — see
/// [`Segment::sanitized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    /// Drop segments with an unset `start`/`end` and reassign the survivors
    /// to speaker `"0"` when the engine didn't stamp one.
    ///
    /// This replaces the third-party monkey-patch the original service
    /// applied at import time: rather than mutate a library, every concrete
    /// [`Engine`](crate::Engine) runs its raw output through this function
    /// before the scheduler ever sees it.
    pub fn sanitize(raw: Vec<RawSegment>) -> Vec<Segment> {
        raw.into_iter()
            .filter_map(|r| {
                let (start, end) = (r.start?, r.end?);
                Some(Segment {
                    id: r.id,
                    speaker: r.speaker.or_else(|| Some("0".to_string())),
                    start,
                    end,
                    text: r.text,
                })
            })
            .collect()
    }
}

/// Unsanitized segment as an [`Engine`](crate::Engine) adapter may emit it,
/// before [`Segment::sanitize`] drops incomplete entries.
#[derive(Debug, Clone, Default)]
pub struct RawSegment {
    pub id: u32,
    pub speaker: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: String,
}

/// Outcome of a successful `transcribe` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub duration: f64,
    pub language: String,
    pub model_id: String,
    /// Present iff the engine has the `timestamp` capability and the
    /// client asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
}

impl TranscriptionResult {
    /// The result for zero-length (or silence-only) audio: empty text, no
    /// error. The original behaviour here was unspecified; this is the
    /// chosen resolution, common to every `Engine` adapter rather than
    /// left to whatever each back-end happens to do with an empty file.
    pub fn empty(model_id: impl Into<String>, opts: TranscriptionOptions) -> Self {
        Self {
            text: String::new(),
            duration: 0.0,
            language: opts.language.as_str().to_string(),
            model_id: model_id.into(),
            segments: opts.with_timestamp.then(Vec::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_incomplete_segments_and_fills_fallback_speaker() {
        let raw = vec![
            RawSegment {
                id: 0,
                speaker: None,
                start: Some(0.0),
                end: Some(1.5),
                text: "hello".into(),
            },
            RawSegment {
                id: 1,
                speaker: None,
                start: None,
                end: Some(2.0),
                text: "dropped".into(),
            },
            RawSegment {
                id: 2,
                speaker: Some("1".into()),
                start: Some(2.0),
                end: Some(3.0),
                text: "speaker tagged".into(),
            },
        ];

        let segments = Segment::sanitize(raw);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker.as_deref(), Some("0"));
        assert_eq!(segments[1].speaker.as_deref(), Some("1"));
    }

    #[test]
    fn output_format_openai_alias_vtt_maps_to_srt() {
        assert_eq!(
            OutputFormat::from_openai_alias("vtt"),
            Some(OutputFormat::Srt)
        );
        assert_eq!(
            OutputFormat::from_openai_alias("verbose_json"),
            Some(OutputFormat::Json)
        );
        assert_eq!(
            OutputFormat::from_openai_alias("text"),
            Some(OutputFormat::Txt)
        );
        assert_eq!(OutputFormat::from_openai_alias("bogus"), None);
    }

    #[test]
    fn language_parse_empty_means_auto() {
        assert_eq!(Language::parse(""), Some(Language::Auto));
        assert_eq!(Language::parse("auto"), Some(Language::Auto));
        assert_eq!(Language::parse("fr"), None);
    }
}
