//! Query Driver (C3) — create a Query, poll it to a terminal phase, and
//! extract its response content or error detail.
//!
//! Grounded on `original_source/.../a2agw/query.py` for the A2A-path
//! contract (1s poll interval, plain content-or-error result) and
//! `original_source/.../ark_api/utils/query_polling.py` for the
//! OpenAI-path contract (5s interval, 60-attempt ceiling, richer error
//! detail aggregation across `status.responses[]`).

use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway_error::{GatewayError, GatewayResult, TargetError};
use crate::registry::{
    ObjectMeta, Query, QueryInput, QuerySpec, QueryStatus, QueryTarget, SharedRegistry,
};

/// A2A-path poll interval (SPEC_FULL §4.3, §5).
const A2A_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// OpenAI-path poll interval and attempt ceiling (SPEC_FULL §4.3: 5-minute
/// ceiling at 5s/attempt).
const OPENAI_POLL_INTERVAL: Duration = Duration::from_secs(5);
const OPENAI_MAX_ATTEMPTS: u32 = 60;

const PHASE_DONE: &str = "done";
const PHASE_ERROR: &str = "error";

/// Outcome of polling a Query to a terminal phase on the OpenAI path: either
/// the winning response's content, or a structured error detail (SPEC_FULL
/// §4.3's `{message, errors[]}` shape).
#[derive(Debug, Clone)]
pub enum ChatCompletionOutcome {
    Done(String),
    Error { message: String, errors: Vec<TargetError> },
}

/// Creates Queries and polls them to a terminal phase (C3).
#[derive(Clone)]
pub struct QueryDriver {
    registry: SharedRegistry,
    namespace: String,
}

impl QueryDriver {
    pub fn new(registry: SharedRegistry, namespace: impl Into<String>) -> Self {
        Self {
            registry,
            namespace: namespace.into(),
        }
    }

    /// Generate an 8-hex-nibble unique Query name with the given prefix
    /// (SPEC_FULL §4.3: `"a2agw-query-"` on the A2A path, `"openai-query-"`
    /// on the OpenAI path).
    fn generate_name(prefix: &str) -> String {
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        format!("{prefix}{suffix}")
    }

    /// Create a Query targeting exactly one `{name, type}` pair and return
    /// its generated name (SPEC_FULL §4.3 `post_query`).
    pub async fn post_query(
        &self,
        name_prefix: &str,
        target_type: &str,
        target_name: &str,
        input: QueryInput,
        timeout_sec: u64,
        annotations: std::collections::HashMap<String, String>,
    ) -> GatewayResult<String> {
        let query_name = Self::generate_name(name_prefix);
        let query_type = match &input {
            QueryInput::Text(_) => "user",
            QueryInput::Messages(_) => "messages",
        };

        let query = Query {
            metadata: ObjectMeta {
                name: query_name.clone(),
                namespace: Some(self.namespace.clone()),
                annotations,
                creation_timestamp: None,
            },
            spec: QuerySpec {
                input,
                query_type: query_type.to_string(),
                targets: vec![QueryTarget {
                    name: target_name.to_string(),
                    target_type: target_type.to_string(),
                }],
                timeout: format!("{timeout_sec}s"),
                cancel: None,
            },
            status: QueryStatus::default(),
        };

        debug!(query_name = %query_name, target = %target_name, "posting query");
        self.registry.create_query(query).await?;
        Ok(query_name)
    }

    /// Poll a Query with a 1-second interval until it reaches `done` or
    /// `error`, or the timeout elapses (SPEC_FULL §4.3 `wait_for_query`,
    /// A2A path).
    pub async fn wait_for_query(&self, query_name: &str, timeout_sec: u64) -> GatewayResult<String> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_sec);

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(GatewayError::upstream_timeout(format!(
                    "query '{query_name}' timed out after {timeout_sec}s"
                )));
            }

            match self.registry.get_query(query_name).await {
                Ok(query) => match query.status.phase.as_deref() {
                    Some(PHASE_DONE) => {
                        return Ok(query
                            .status
                            .responses
                            .first()
                            .and_then(|r| r.content.clone())
                            .unwrap_or_else(|| {
                                "Query completed but no response available".to_string()
                            }));
                    }
                    Some(PHASE_ERROR) => {
                        let message = query
                            .status
                            .responses
                            .first()
                            .and_then(|r| r.content.clone())
                            .unwrap_or_else(|| "Query failed".to_string());
                        return Err(GatewayError::UpstreamErrorPhase {
                            message,
                            errors: Vec::new(),
                        });
                    }
                    _ => {}
                },
                Err(GatewayError::NotFound(msg)) => {
                    return Err(GatewayError::NotFound(msg));
                }
                Err(err) => {
                    warn!(query_name = %query_name, error = %err, "transient error polling query, retrying");
                }
            }

            tokio::time::sleep(A2A_POLL_INTERVAL).await;
        }
    }

    /// `post_query` + `wait_for_query` (SPEC_FULL §4.3 `post_query_and_wait`).
    pub async fn post_query_and_wait(
        &self,
        target_type: &str,
        target_name: &str,
        input: QueryInput,
        timeout_sec: u64,
    ) -> GatewayResult<String> {
        let query_name = self
            .post_query(
                "a2agw-query-",
                target_type,
                target_name,
                input,
                timeout_sec,
                std::collections::HashMap::new(),
            )
            .await?;
        self.wait_for_query(&query_name, timeout_sec).await
    }

    /// Create a Query and poll it on the OpenAI cadence: 60 attempts at
    /// 5-second intervals (a 5-minute ceiling), returning a structured
    /// outcome instead of raising (SPEC_FULL §4.3's OpenAI-path extension).
    pub async fn post_query_and_wait_for_chat_completion(
        &self,
        target_type: &str,
        target_name: &str,
        input: QueryInput,
        annotations: std::collections::HashMap<String, String>,
    ) -> GatewayResult<(String, ChatCompletionOutcome)> {
        let query_name = self
            .post_query(
                "openai-query-",
                target_type,
                target_name,
                input,
                OPENAI_MAX_ATTEMPTS as u64 * OPENAI_POLL_INTERVAL.as_secs(),
                annotations,
            )
            .await?;

        let outcome = self.poll_for_chat_completion(&query_name).await?;
        Ok((query_name, outcome))
    }

    /// Poll an already-created Query on the OpenAI cadence.
    pub async fn poll_for_chat_completion(
        &self,
        query_name: &str,
    ) -> GatewayResult<ChatCompletionOutcome> {
        for attempt in 0..OPENAI_MAX_ATTEMPTS {
            match self.registry.get_query(query_name).await {
                Ok(query) => match query.status.phase.as_deref() {
                    Some(PHASE_DONE) => {
                        let content = query
                            .status
                            .responses
                            .first()
                            .and_then(|r| r.content.clone())
                            .unwrap_or_else(|| {
                                "Query completed but no response available".to_string()
                            });
                        return Ok(ChatCompletionOutcome::Done(content));
                    }
                    Some(PHASE_ERROR) => {
                        return Ok(Self::error_outcome(&query.status));
                    }
                    _ => {}
                },
                Err(GatewayError::NotFound(msg)) => {
                    return Err(GatewayError::NotFound(msg));
                }
                Err(err) => {
                    warn!(query_name = %query_name, attempt, error = %err, "transient error polling query, retrying");
                }
            }

            tokio::time::sleep(OPENAI_POLL_INTERVAL).await;
        }

        Err(GatewayError::upstream_timeout(format!(
            "query '{query_name}' did not reach a terminal phase within {} attempts",
            OPENAI_MAX_ATTEMPTS
        )))
    }

    /// Build the `{message, errors[]}` error detail from a Query's
    /// `status.responses[]` (SPEC_FULL §4.3): the first non-empty content
    /// wins as `message`, falling back to `status.message` and finally a
    /// fixed literal; `errors` is populated only when two or more targets
    /// reported non-empty content.
    fn error_outcome(status: &QueryStatus) -> ChatCompletionOutcome {
        let non_empty: Vec<_> = status
            .responses
            .iter()
            .filter(|r| r.content.as_deref().is_some_and(|c| !c.is_empty()))
            .collect();

        let message = non_empty
            .first()
            .and_then(|r| r.content.clone())
            .or_else(|| status.message.clone())
            .unwrap_or_else(|| "Query execution failed: No error details available".to_string());

        let errors = if non_empty.len() >= 2 {
            non_empty
                .iter()
                .map(|r| TargetError {
                    target: r.target.clone().unwrap_or_default(),
                    message: r.content.clone().unwrap_or_default(),
                })
                .collect()
        } else {
            Vec::new()
        };

        ChatCompletionOutcome::Error { message, errors }
    }
}
