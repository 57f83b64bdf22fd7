//! OpenAI-compatible chat-completions surface (C6, C7 — SPEC_FULL §4.6,
//! §4.7).

pub mod adapter;
pub mod streaming_proxy;
pub mod types;

pub use adapter::{router, OpenAiAdapter};
