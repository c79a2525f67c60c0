//! End-to-end HTTP tests (§8) driven through the real `axum::Router`
//! against `tower::ServiceExt::oneshot`, backed by
//! `stt_gateway_engines::StubEngine` so no sidecar or subprocess is ever
//! touched.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use stt_gateway_core::{Engine, EngineCapabilities, EngineKind, ModelSpec};
use stt_gateway_engines::StubEngine;
use stt_gateway_server::build_router;
use stt_gateway_server::scheduler::{EngineFactory, Scheduler};
use stt_gateway_server::state::AppState;

fn stub_spec(model_id: &str, capabilities: EngineCapabilities) -> ModelSpec {
    ModelSpec {
        alias: "test-spec".to_string(),
        engine_kind: EngineKind::Funasr,
        model_id: model_id.to_string(),
        description: "test fixture".to_string(),
        capabilities,
    }
}

fn stub_factory() -> EngineFactory {
    std::sync::Arc::new(|spec: &ModelSpec| {
        Box::new(StubEngine::new(spec.model_id.clone(), spec.engine_kind).with_capabilities(spec.capabilities))
            as Box<dyn Engine>
    })
}

fn test_app(initial: ModelSpec) -> axum::Router {
    let scheduler = Scheduler::start(initial, stub_factory(), 8).unwrap();
    let state = AppState {
        scheduler,
        max_upload_bytes: 1024 * 1024,
    };
    build_router(state, &["*".to_string()])
}

/// Builds a `multipart/form-data` body by hand: one text part per
/// `(name, value)` pair, then a `file` part with the given content type.
fn multipart_body(fields: &[(&str, &str)], file_content_type: &str, file_bytes: &[u8]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "stt-gateway-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\nContent-Type: {file_content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn post_transcription(content_type: String, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/audio/transcriptions")
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn transcription_defaults_to_json_and_returns_the_engine_text() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let (content_type, body) = multipart_body(&[], "audio/wav", b"fake-wav-bytes");

    let response = app.oneshot(post_transcription(content_type, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["text"], "stub transcription");
    assert_eq!(json["model"], "fixture-model");
}

#[tokio::test]
async fn response_format_text_overrides_output_format_and_returns_plain_text() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let (content_type, body) = multipart_body(
        &[("output_format", "json"), ("response_format", "text")],
        "audio/wav",
        b"fake-wav-bytes",
    );

    let response = app.oneshot(post_transcription(content_type, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"stub transcription");
}

#[tokio::test]
async fn unsupported_media_type_is_rejected_with_415() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let (content_type, body) = multipart_body(&[], "text/plain", b"not audio");

    let response = app.oneshot(post_transcription(content_type, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn unknown_language_is_a_bad_request() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let (content_type, body) = multipart_body(&[("language", "fr")], "audio/wav", b"fake-wav-bytes");

    let response = app.oneshot(post_transcription(content_type, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn srt_against_a_timestampless_current_model_is_rejected_before_queueing() {
    let mut timestampless = EngineCapabilities::conservative();
    timestampless.timestamp = false;
    let app = test_app(stub_spec("fixture-model", timestampless));
    let (content_type, body) = multipart_body(&[("output_format", "srt")], "audio/wav", b"fake-wav-bytes");

    let response = app.oneshot(post_transcription(content_type, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn models_endpoint_reports_the_currently_loaded_model() {
    let app = test_app(stub_spec("fixture-model", EngineCapabilities::conservative()));
    let response = app
        .oneshot(Request::builder().uri("/v1/models/current").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["model_id"], "fixture-model");
    assert_eq!(json["state"], "running");
}
