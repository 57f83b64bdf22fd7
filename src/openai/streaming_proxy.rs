//! Streaming Proxy (C7) — forwards a backend SSE channel line-for-line to
//! the OpenAI-compatible caller (SPEC_FULL §4.7).
//!
//! Grounded on `original_source/.../ark_api/routes/openai.py`'s streaming
//! proxy (a 10s-connect/no-read-timeout GET, forwarded line-by-line) and,
//! for the Rust-side byte-stream-to-line buffering idiom, the teacher's own
//! SSE parsing in `src/client/sse.rs` (now dropped — see DESIGN.md — but its
//! buffer-and-split-on-newline technique is reused here for the reverse
//! direction: forwarding rather than parsing into typed events).

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use serde_json::Value;
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the `<base_url>/stream/<query_name>?from-beginning=true&wait-for-query=30s`
/// streaming URL (SPEC_FULL §4.6).
pub fn stream_url(base_url: &str, query_name: &str) -> String {
    format!(
        "{}/stream/{}?from-beginning=true&wait-for-query=30s",
        base_url.trim_end_matches('/'),
        query_name
    )
}

/// Build the client this proxy should issue its GET through: a 10-second
/// connect timeout and no overall/read timeout (SPEC_FULL §4.7).
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("static reqwest client configuration is valid")
}

/// Open the backend streaming channel and return an axum [`Response`] that
/// forwards it frame-by-frame as it arrives (SPEC_FULL §4.7). On non-2xx (or
/// a connection failure), synthesizes exactly one OpenAI-shaped error frame
/// and ends the stream — never surfaced as an HTTP error, since SSE headers
/// are already committed by the time the body starts. `client` must have no
/// overall request timeout (see [`build_client`]) — a read timeout here
/// would cut off a long-lived SSE channel.
pub async fn proxy_stream(client: reqwest::Client, base_url: &str, query_name: &str) -> Response {
    let url = stream_url(base_url, query_name);

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => forward_body(response),
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            sse_response(synthesize_error_frame(status, &body))
        }
        Err(err) => {
            warn!(url = %url, error = %err, "failed to connect to streaming backend");
            sse_response(synthesize_connect_error_frame(&err))
        }
    }
}

/// Stream the upstream body through, forwarding each non-empty line as
/// `line + "\n\n"` (SPEC_FULL §4.7's exact framing rule).
fn forward_body(response: reqwest::Response) -> Response {
    let byte_stream = response.bytes_stream();
    let line_stream = async_stream::stream! {
        let mut buffer = String::new();
        futures::pin_mut!(byte_stream);
        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "error reading streaming backend body, ending stream");
                    break;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].to_string();
                buffer.drain(..=pos);
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    yield Ok::<_, std::io::Error>(format!("{trimmed}\n\n"));
                }
            }
        }
        let trailing = buffer.trim();
        if !trailing.is_empty() {
            yield Ok(format!("{trailing}\n\n"));
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(line_stream))
        .expect("static SSE response headers are valid")
}

fn sse_response(frame: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from(format!("data: {frame}\n\n")))
        .expect("static SSE response headers are valid")
}

/// Parse `{error: {message, type, code?}}` from a non-2xx backend response;
/// on any parse failure, synthesize the fixed shape from SPEC_FULL §4.7.
fn synthesize_error_frame(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_value = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .filter(|e| e.get("message").is_some());

    let frame = match error_value {
        Some(error) => serde_json::json!({ "error": error }),
        None => serde_json::json!({
            "error": {
                "status": status.as_u16(),
                "message": format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("")),
                "type": "server_error",
                "code": "server_error",
            }
        }),
    };

    serde_json::to_string(&frame).unwrap_or_else(|_| {
        r#"{"error":{"message":"server_error","type":"server_error","code":"server_error"}}"#
            .to_string()
    })
}

fn synthesize_connect_error_frame(err: &reqwest::Error) -> String {
    let frame = serde_json::json!({
        "error": {
            "status": 502,
            "message": format!("502 {err}"),
            "type": "server_error",
            "code": "server_error",
        }
    });
    serde_json::to_string(&frame).unwrap_or_else(|_| {
        r#"{"error":{"message":"server_error","type":"server_error","code":"server_error"}}"#
            .to_string()
    })
}
