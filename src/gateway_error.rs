//! Gateway-level error taxonomy (SPEC_FULL §7).
//!
//! Distinct from [`crate::error::A2AError`], which carries the A2A protocol's
//! own JSON-RPC error codes and is used only within a per-agent sub-handler's
//! JSON-RPC envelope. `GatewayError` is the error type for everything outside
//! that per-agent surface: the registry reader, the query driver, the
//! reconcile loop, and the OpenAI adapter. It converts directly to an HTTP
//! response at the outermost handler, per the propagation policy in §7 —
//! internal components never translate to HTTP themselves.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// One element of an OpenAI-style multi-target error list.
#[derive(Debug, Clone, Serialize)]
pub struct TargetError {
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Malformed request body or unknown metadata shape (§7.1).
    #[error("validation error: {0}")]
    Validation(String),

    /// `metadata.ark` on a chat-completion request failed to parse as
    /// `{annotations: map<string,string>?}` (SPEC_FULL §4.6).
    #[error("Invalid Ark metadata: {0}")]
    InvalidArkMetadata(String),

    /// Registry returned 404 for a named resource (§7.2).
    #[error("not found: {0}")]
    NotFound(String),

    /// A query exceeded its configured timeout (§7.3).
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// A query reached `phase == "error"` (§7.4).
    #[error("upstream error: {message}")]
    UpstreamErrorPhase {
        message: String,
        errors: Vec<TargetError>,
    },

    /// Connection/read error against the registry or streaming backend (§7.5).
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// A task was canceled; carried for completeness, never surfaced as an
    /// HTTP error (§7.6 — cancellation ends in a `canceled` event, not an
    /// HTTP status).
    #[error("canceled")]
    Cancellation,

    /// Catch-all for errors with no more specific kind above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn upstream_timeout(msg: impl Into<String>) -> Self {
        Self::UpstreamTimeout(msg.into())
    }

    pub fn invalid_ark_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidArkMetadata(msg.into())
    }

    /// The `type` field OpenAI uses for this kind of error.
    fn openai_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_request_error",
            Self::InvalidArkMetadata(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::UpstreamTimeout(_) => "timeout_error",
            Self::UpstreamErrorPhase { .. } => "server_error",
            Self::TransientIo(_) => "server_error",
            Self::Cancellation => "server_error",
            Self::Internal(_) => "server_error",
        }
    }

    fn openai_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_value",
            Self::InvalidArkMetadata(_) => "invalid_ark_metadata",
            Self::NotFound(_) => "not_found",
            Self::UpstreamTimeout(_) => "timeout",
            Self::UpstreamErrorPhase { .. } => "upstream_error",
            Self::TransientIo(_) => "transient_io_error",
            Self::Cancellation => "canceled",
            Self::Internal(_) => "internal_error",
        }
    }

    /// The HTTP status this error maps to on the OpenAI surface (§7).
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidArkMetadata(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::INTERNAL_SERVER_ERROR, // §7.2: 500 at OpenAI layer
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamErrorPhase { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TransientIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancellation => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the `{"error": {...}}` OpenAI-compatible body for this error.
    pub fn to_openai_body(&self) -> serde_json::Value {
        match self {
            Self::UpstreamErrorPhase { message, errors } => serde_json::json!({
                "error": {
                    "message": message,
                    "type": self.openai_type(),
                    "code": self.openai_code(),
                    "errors": errors,
                }
            }),
            other => serde_json::json!({
                "error": {
                    "message": other.to_string(),
                    "type": other.openai_type(),
                    "code": other.openai_code(),
                }
            }),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_openai_body())).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
