//! Output formatters (C9, §6 response bodies).
//!
//! Each formatter is a pure function over a [`TranscriptionResult`] — no
//! I/O, no engine knowledge. Kept in their own crate so the idempotence
//! property in §8 (`srt` response == formatting a `json` response's
//! segments) is checkable without involving the HTTP layer at all.

use stt_gateway_core::{Segment, TranscriptionResult};

/// `output_format=json`: `{text, duration?, language?, model, segments?}`.
pub fn to_json(result: &TranscriptionResult) -> serde_json::Value {
    serde_json::json!({
        "text": result.text,
        "duration": result.duration,
        "language": result.language,
        "model": result.model_id,
        "segments": result.segments,
    })
}

/// `output_format=txt`: one line per segment. When `with_timestamp`,
/// each line is prefixed with `[MM:SS]`; diarized segments are further
/// prefixed with `[Speaker N]: `. Falls back to the bare transcript when
/// there are no segments (engine lacks `timestamp`/`diarization`, or the
/// client didn't ask for them).
pub fn to_txt(result: &TranscriptionResult, with_timestamp: bool) -> String {
    let Some(segments) = result.segments.as_ref().filter(|s| !s.is_empty()) else {
        return result.text.clone();
    };

    segments
        .iter()
        .map(|segment| {
            let mut line = String::new();
            if with_timestamp {
                line.push_str(&format!("[{}] ", format_mm_ss(segment.start)));
            }
            if let Some(speaker) = &segment.speaker {
                line.push_str(&format!("[Speaker {speaker}]: "));
            }
            line.push_str(&segment.text);
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `output_format=srt`: standard SubRip. Requires `segments` — callers
/// must have already enforced the `timestamp` capability guard (§4.2)
/// before reaching this function.
pub fn to_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_srt_timestamp(segment.start),
                format_srt_timestamp(segment.end),
                segment.text,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_mm_ss(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

fn format_srt_timestamp(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0);
    let whole_seconds = total_seconds as u64;
    let millis = ((total_seconds - whole_seconds as f64) * 1000.0).round() as u64;
    let hours = whole_seconds / 3600;
    let minutes = (whole_seconds % 3600) / 60;
    let seconds = whole_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(segments: Option<Vec<Segment>>) -> TranscriptionResult {
        TranscriptionResult {
            text: "hello world".to_string(),
            duration: 4.5,
            language: "en".to_string(),
            model_id: "paraformer".to_string(),
            segments,
        }
    }

    fn segment(id: u32, speaker: Option<&str>, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            id,
            speaker: speaker.map(str::to_string),
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn json_includes_model_and_segments() {
        let result = sample_result(Some(vec![segment(0, Some("0"), 0.0, 1.0, "hello")]));
        let value = to_json(&result);
        assert_eq!(value["model"], "paraformer");
        assert_eq!(value["segments"][0]["speaker"], "0");
    }

    #[test]
    fn txt_falls_back_to_bare_text_without_segments() {
        let result = sample_result(None);
        assert_eq!(to_txt(&result, true), "hello world");
    }

    #[test]
    fn txt_prefixes_timestamp_and_speaker_when_present() {
        let result = sample_result(Some(vec![
            segment(0, Some("0"), 0.0, 2.0, "hi there"),
            segment(1, Some("1"), 65.0, 70.0, "hello back"),
        ]));
        let text = to_txt(&result, true);
        assert_eq!(
            text,
            "[00:00] [Speaker 0]: hi there\n[01:05] [Speaker 1]: hello back"
        );
    }

    #[test]
    fn txt_omits_timestamp_prefix_when_not_requested() {
        let result = sample_result(Some(vec![segment(0, Some("0"), 0.0, 2.0, "hi there")]));
        assert_eq!(to_txt(&result, false), "[Speaker 0]: hi there");
    }

    #[test]
    fn srt_formats_timestamps_as_subrip() {
        let segments = vec![
            segment(0, None, 0.0, 1.5, "hello"),
            segment(1, None, 65.25, 70.0, "world"),
        ];
        let srt = to_srt(&segments);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,500\nhello\n"));
        assert!(srt.contains("2\n00:01:05,250 --> 00:01:10,000\nworld\n"));
    }

    #[test]
    fn srt_idempotent_across_repeated_calls() {
        let segments = vec![segment(0, Some("0"), 0.0, 1.0, "hi")];
        assert_eq!(to_srt(&segments), to_srt(&segments));
    }
}
