//! Per-Agent Executor (C4) — `QueryAgentExecutor`, the [`AgentExecutor`]
//! implementation bound to one agent name.
//!
//! Grounded on `original_source/.../a2agw/execution.py::ARKAgentExecutor`,
//! translated task-for-task: text extraction, the
//! `working -> (text, completed|failed|canceled)` event sequence, and a
//! `task_id -> cancellation handle` map guarded by a mutex held only across
//! map mutation (SPEC_FULL §4.4, §9). The cancellation handle is a
//! `tokio::task::AbortHandle` rather than the raw spawned future, per the
//! Design Notes' "prefer a cancellation handle" guidance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::error::A2AResult;
use crate::query::QueryDriver;
use crate::registry::{QueryInput, SharedRegistry};
use crate::server::{AgentExecutor, EventQueue, RequestContext, TaskUpdater};
use crate::types::{Part, StreamResponse};

/// Identifier used when the caller omitted one (SPEC_FULL §4.4).
const DEFAULT_CONTEXT_ID: &str = "default";
const DEFAULT_TASK_ID: &str = "unknown";

/// Drives one A2A task's lifecycle for a single agent: submits a Query,
/// tracks it until terminal phase, and emits the A2A status/message events
/// the inbound request expects (C4).
pub struct QueryAgentExecutor {
    registry: SharedRegistry,
    namespace: String,
    target_name: String,
    default_timeout_secs: u64,
    /// `task_id -> cancellation handle` for in-flight query computations
    /// (SPEC_FULL §3 Task, §4.4 concurrency — guarded, held only across
    /// mutation, never across I/O).
    tasks: Mutex<HashMap<String, AbortHandle>>,
}

impl QueryAgentExecutor {
    pub fn new(
        registry: SharedRegistry,
        namespace: impl Into<String>,
        target_name: impl Into<String>,
        default_timeout_secs: u64,
    ) -> Self {
        Self {
            registry,
            namespace: namespace.into(),
            target_name: target_name.into(),
            default_timeout_secs,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Extract text from the first text part of the inbound message; `"No
    /// message"` if absent or empty of text parts (SPEC_FULL §4.4).
    fn extract_text(context: &RequestContext) -> String {
        context
            .message
            .as_ref()
            .and_then(|message| {
                message.parts.iter().find_map(|part| match part {
                    Part::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
            })
            .unwrap_or_else(|| "No message".to_string())
    }

    fn effective_ids(context: &RequestContext) -> (String, String) {
        let task_id = if context.task_id.is_empty() {
            DEFAULT_TASK_ID.to_string()
        } else {
            context.task_id.clone()
        };
        let context_id = if context.context_id.is_empty() {
            DEFAULT_CONTEXT_ID.to_string()
        } else {
            context.context_id.clone()
        };
        (task_id, context_id)
    }

    async fn emit_text_message(
        &self,
        event_queue: &EventQueue,
        updater: &TaskUpdater,
        text: impl Into<String>,
    ) {
        let message = updater.new_agent_message(vec![Part::text(text.into())], None);
        if let Err(err) = event_queue.enqueue_event(StreamResponse::Message(message)).await {
            warn!(error = %err, "failed to enqueue agent text message");
        }
    }
}

#[async_trait]
impl AgentExecutor for QueryAgentExecutor {
    /// Execute sequence (SPEC_FULL §4.4): `working` -> submit a cancellable
    /// `post_query_and_wait` -> await it up to the configured timeout ->
    /// emit content/timeout/error text, then a terminal status event.
    async fn execute(&self, context: RequestContext, event_queue: EventQueue) -> A2AResult<()> {
        let (task_id, context_id) = Self::effective_ids(&context);
        let updater = TaskUpdater::new(event_queue.clone(), task_id.clone(), context_id.clone());

        if let Err(err) = updater.start_work(None).await {
            warn!(task_id = %task_id, error = %err, "failed to publish working status");
        }

        let user_text = Self::extract_text(&context);
        let driver = QueryDriver::new(Arc::clone(&self.registry), self.namespace.clone());
        let target = self.target_name.clone();
        let timeout_secs = self.default_timeout_secs;

        let join_handle = tokio::spawn(async move {
            driver
                .post_query_and_wait("agent", &target, QueryInput::Text(user_text), timeout_secs)
                .await
        });
        let abort_handle = join_handle.abort_handle();

        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(task_id.clone(), abort_handle.clone());
        }

        let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), join_handle).await;

        {
            let mut tasks = self.tasks.lock().await;
            tasks.remove(&task_id);
        }

        match outcome {
            Ok(Ok(Ok(content))) => {
                self.emit_text_message(&event_queue, &updater, content).await;
                if let Err(err) = updater.complete(None).await {
                    warn!(task_id = %task_id, error = %err, "failed to publish completed status");
                }
            }
            Ok(Ok(Err(query_err))) => {
                self.emit_text_message(&event_queue, &updater, format!("Error: {query_err}"))
                    .await;
                if let Err(err) = updater.failed(None).await {
                    warn!(task_id = %task_id, error = %err, "failed to publish failed status");
                }
            }
            Ok(Err(join_err)) => {
                // A concurrent `cancel()` aborted the join handle directly and
                // already emitted the `canceled` terminal event; don't double-emit.
                if !join_err.is_cancelled() {
                    self.emit_text_message(
                        &event_queue,
                        &updater,
                        format!("Error: {join_err}"),
                    )
                    .await;
                    if let Err(err) = updater.failed(None).await {
                        warn!(task_id = %task_id, error = %err, "failed to publish failed status");
                    }
                }
            }
            Err(_elapsed) => {
                abort_handle.abort();
                self.emit_text_message(
                    &event_queue,
                    &updater,
                    format!("Query timed out after {timeout_secs} seconds"),
                )
                .await;
                let timeout_message =
                    updater.new_agent_message(
                        vec![Part::text(format!("Query timeout after {timeout_secs}s"))],
                        None,
                    );
                if let Err(err) = updater
                    .update_status(crate::types::TaskState::Failed, Some(timeout_message), true, None)
                    .await
                {
                    warn!(task_id = %task_id, error = %err, "failed to publish timeout status");
                }
            }
        }

        Ok(())
    }

    /// Cancel sequence (SPEC_FULL §4.4): idempotent — the first call aborts
    /// the registered computation and emits `canceled`; a task absent from
    /// the map (already finished, or a repeat call) is a no-op.
    async fn cancel(&self, context: RequestContext, event_queue: EventQueue) -> A2AResult<()> {
        let (task_id, context_id) = Self::effective_ids(&context);

        let handle = {
            let mut tasks = self.tasks.lock().await;
            tasks.remove(&task_id)
        };

        let Some(handle) = handle else {
            info!(task_id = %task_id, "cancel requested for task with no registered computation, ignoring");
            return Ok(());
        };

        handle.abort();

        let updater = TaskUpdater::new(event_queue, task_id.clone(), context_id);
        if let Err(err) = updater.cancel(None).await {
            warn!(task_id = %task_id, error = %err, "failed to publish canceled status");
        }

        Ok(())
    }
}
