//! HTTP handlers (C2, §4.7). Each is a small, focused function taking
//! `State<AppState>` plus whatever extractors it needs, grounded on the
//! teacher's `mcp_server.rs` handler shape — one method, one function,
//! errors surfaced through `?` into a single composite error type.

use std::io::Write;

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use tempfile::NamedTempFile;

use stt_gateway_core::{
    AdmissionError, EngineCapabilities, Language, OutputFormat, TranscriptionJob,
    TranscriptionRequest,
};

use crate::admission;
use crate::error::GatewayError;
use crate::request_id::RequestId;
use crate::state::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_models(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    match list_models_inner(&state).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response_with_request_id(request_id.0),
    }
}

async fn list_models_inner(state: &AppState) -> Result<serde_json::Value, GatewayError> {
    let specs = stt_gateway_registry::all();
    let status = state
        .scheduler
        .status()
        .await
        .map_err(|_| GatewayError::ServiceDegraded("scheduler is not responding".to_string()))?;

    let models: Vec<serde_json::Value> = specs
        .iter()
        .map(|spec| {
            serde_json::json!({
                "alias": spec.alias,
                "engine_kind": spec.engine_kind,
                "model_id": spec.model_id,
                "description": spec.description,
                "capabilities": spec.capabilities,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "models": models,
        "current": status.model_alias.unwrap_or(status.model_id),
    }))
}

pub async fn current_model(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    match state.scheduler.status().await {
        Ok(status) => Json(status).into_response(),
        Err(_) => GatewayError::ServiceDegraded("scheduler is not responding".to_string())
            .into_response_with_request_id(request_id.0),
    }
}

fn resolve_output_format(
    output_format_raw: Option<&str>,
    response_format_raw: Option<&str>,
) -> Result<OutputFormat, GatewayError> {
    // `response_format` (OpenAI compatibility) overrides `output_format`
    // when both are present (§6).
    if let Some(raw) = response_format_raw {
        return OutputFormat::from_openai_alias(raw).ok_or_else(|| {
            GatewayError::Admission(AdmissionError::BadParameter {
                field: "response_format".to_string(),
                reason: format!("unrecognized value `{raw}`"),
            })
        });
    }
    match output_format_raw {
        None => Ok(OutputFormat::Json),
        Some(raw) => OutputFormat::parse(raw).ok_or_else(|| {
            GatewayError::Admission(AdmissionError::BadParameter {
                field: "output_format".to_string(),
                reason: format!("unrecognized value `{raw}`"),
            })
        }),
    }
}

fn resolve_language(raw: Option<&str>) -> Result<Language, GatewayError> {
    Language::parse(raw.unwrap_or("auto")).ok_or_else(|| {
        GatewayError::Admission(AdmissionError::BadParameter {
            field: "language".to_string(),
            reason: format!("unrecognized value `{}`", raw.unwrap_or("")),
        })
    })
}

/// The capability set that will be in effect once this request's model
/// choice takes hold: the requested model's, when not a passthrough form,
/// else whatever is currently loaded.
async fn capabilities_for(
    state: &AppState,
    requested_model: Option<&str>,
) -> Result<EngineCapabilities, GatewayError> {
    match requested_model {
        Some(raw) if !stt_gateway_registry::is_passthrough(Some(raw)) => {
            Ok(stt_gateway_registry::resolve(raw)?.capabilities)
        }
        _ => {
            let status = state.scheduler.status().await.map_err(|_| {
                GatewayError::ServiceDegraded("scheduler is not responding".to_string())
            })?;
            Ok(status.capabilities)
        }
    }
}

pub async fn transcribe(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Multipart,
) -> Response {
    match transcribe_inner(state, request_id, multipart).await {
        Ok(response) => response,
        Err(e) => e.into_response_with_request_id(request_id.0),
    }
}

async fn transcribe_inner(
    state: AppState,
    request_id: RequestId,
    mut multipart: Multipart,
) -> Result<Response, GatewayError> {
    let mut temp_file: Option<NamedTempFile> = None;
    let mut output_format_raw: Option<String> = None;
    let mut response_format_raw: Option<String> = None;
    let mut with_timestamp_raw = false;
    let mut language_raw: Option<String> = None;
    let mut model_raw: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadMultipart(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let content_type = field.content_type().unwrap_or("application/octet-stream");
                admission::check_media_type(content_type)?;

                let mut file =
                    NamedTempFile::new().map_err(|e| GatewayError::Internal(e.into()))?;
                let mut total_bytes: u64 = 0;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| GatewayError::BadMultipart(e.to_string()))?
                {
                    total_bytes += chunk.len() as u64;
                    admission::check_upload_size(total_bytes, state.max_upload_bytes)?;
                    file.write_all(&chunk)
                        .map_err(|e| GatewayError::Internal(e.into()))?;
                }
                temp_file = Some(file);
            }
            "output_format" => output_format_raw = Some(field_to_string(field).await?),
            "response_format" => response_format_raw = Some(field_to_string(field).await?),
            "with_timestamp" => with_timestamp_raw = field_to_string(field).await? == "true",
            "language" => language_raw = Some(field_to_string(field).await?),
            "model" => model_raw = Some(field_to_string(field).await?),
            _ => {}
        }
    }

    let Some(temp_file) = temp_file else {
        return Err(GatewayError::BadMultipart(
            "missing required `file` field".to_string(),
        ));
    };

    let output_format =
        resolve_output_format(output_format_raw.as_deref(), response_format_raw.as_deref())?;
    let language = resolve_language(language_raw.as_deref())?;
    let requested_model_capabilities =
        capabilities_for(&state, model_raw.as_deref()).await?;

    let needs_timestamp = with_timestamp_raw || matches!(output_format, OutputFormat::Srt);
    admission::check_format_capability(output_format, needs_timestamp, requested_model_capabilities)?;

    let requested_model = if stt_gateway_registry::is_passthrough(model_raw.as_deref()) {
        None
    } else {
        model_raw
    };

    let temp_audio_path = temp_file
        .into_temp_path()
        .keep()
        .map_err(|e| GatewayError::Internal(e.error.into()))?;

    let request = TranscriptionRequest {
        request_id: request_id.0,
        temp_audio_path: temp_audio_path.clone(),
        language,
        output_format,
        with_timestamp: needs_timestamp,
        requested_model,
    };

    let job = TranscriptionJob::new(request);
    let receiver = match state.scheduler.submit(job) {
        Ok(receiver) => receiver,
        Err(e) => {
            // The job never entered the queue, so the scheduler never
            // gets a chance to delete its temp file.
            let _ = std::fs::remove_file(&temp_audio_path);
            return Err(match e {
                crate::scheduler::SubmitError::QueueFull => GatewayError::QueueFull,
                crate::scheduler::SubmitError::Stopped => {
                    GatewayError::ServiceDegraded("scheduler has shut down".to_string())
                }
            });
        }
    };

    let outcome = receiver
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;

    render_outcome(outcome, output_format, with_timestamp_raw)
}

fn render_outcome(
    outcome: stt_gateway_core::JobOutcome,
    output_format: OutputFormat,
    with_timestamp_raw: bool,
) -> Result<Response, GatewayError> {
    use stt_gateway_core::JobOutcome;

    match outcome {
        JobOutcome::Success(result) => match output_format {
            OutputFormat::Json => Ok(Json(stt_gateway_format::to_json(&result)).into_response()),
            OutputFormat::Txt => Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                stt_gateway_format::to_txt(&result, with_timestamp_raw),
            )
                .into_response()),
            OutputFormat::Srt => {
                let segments = result.segments.unwrap_or_default();
                Ok((
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/x-subrip")],
                    stt_gateway_format::to_srt(&segments),
                )
                    .into_response())
            }
        },
        JobOutcome::Failure(e) => Err(GatewayError::Engine(e)),
        JobOutcome::SwapFailed { message } => Err(GatewayError::SwapFailed(message)),
        JobOutcome::ServiceDegraded { message } => Err(GatewayError::ServiceDegraded(message)),
    }
}

async fn field_to_string(field: axum::extract::multipart::Field<'_>) -> Result<String, GatewayError> {
    field
        .text()
        .await
        .map_err(|e| GatewayError::BadMultipart(e.to_string()))
}
