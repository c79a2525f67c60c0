//! `X-Request-ID` middleware (§4.7): every response carries a fresh UUID,
//! and every log line for that request is keyed by it.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    request.extensions_mut().insert(RequestId(request_id));

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }

    tracing::info!(
        %request_id,
        %method,
        path,
        status = response.status().as_u16(),
        total_time_ms = started_at.elapsed().as_millis() as u64,
        "request complete"
    );

    response
}
