//! Registry Reader (C1) — the cluster-resource read/write surface every
//! other component is built on.

mod reader;
mod types;

pub use reader::{HttpRegistryReader, InMemoryRegistry, MemoryFilter, RegistryReader, SharedRegistry};
pub use types::{
    Agent, AgentSpec, Memory, NamedResource, ObjectMeta, Query, QueryInput, QueryResponse,
    QuerySpec, QueryStatus, QueryTarget, StreamingConfig,
};
