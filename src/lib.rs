//! # ark-a2a-gateway
//!
//! A gateway that bridges cluster-scoped `Agent`/`Query` records to two
//! external client protocols: an agent-to-agent (A2A) JSON-RPC/SSE surface
//! with one dynamically routed sub-handler per live agent, and an
//! OpenAI-compatible chat-completions API.
//!
//! ## Architecture
//!
//! - [`registry`] (C1) — read-only, namespace-scoped view over cluster
//!   Agents/Queries/Memories, with an in-memory backing for tests and an
//!   HTTP-backed reader for a real cluster.
//! - [`card`] (C2) — pure projection from an Agent record to an A2A
//!   [`types::AgentCard`].
//! - [`query`] (C3) — creates Queries and polls them to a terminal phase,
//!   on the A2A-path (1s poll) or OpenAI-path (5s poll, structured error
//!   detail) cadence.
//! - [`executor`] (C4) — [`server::AgentExecutor`] implementation that
//!   drives one A2A task's lifecycle through the query driver, honoring
//!   timeout and cancellation.
//! - [`router`] (C5) — the dynamic route table: one A2A sub-handler per
//!   live agent, reconciled against the registry on a periodic loop behind
//!   an atomically-swapped handler cell.
//! - [`openai`] (C6, C7) — the `/chat/completions` and `/models` adapter,
//!   plus the streaming proxy that forwards a backend SSE channel.
//! - [`app`] (C8) — mounts the above under the gateway's public HTTP
//!   surface.
//! - [`config`] — `GatewayConfig`, assembled once at start-up from CLI
//!   flags and environment variables.
//! - [`gateway_error`] — the gateway's own HTTP error taxonomy, distinct
//!   from the A2A protocol's JSON-RPC error codes in [`error`].
//!
//! The A2A protocol surface itself — wire types, the JSON-RPC request
//! handler, the event queue, and the axum routes each per-agent
//! sub-handler is built from — is carried from the A2A SDK this gateway is
//! built on top of: [`types`], [`error`], [`server`], [`builders`],
//! [`utils`].

pub mod app;
pub mod builders;
pub mod card;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway_error;
pub mod openai;
pub mod query;
pub mod registry;
pub mod router;
pub mod server;
pub mod types;
pub mod utils;

pub use error::{A2AError, A2AResult};
pub use gateway_error::{GatewayError, GatewayResult};
