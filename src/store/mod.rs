//! Access layer for the remote in-memory store.
//!
//! Wraps the redis client with topology selection (single node, cluster,
//! primary/replica with sentinel failover), an admission-control gate on
//! concurrent in-flight operations, and per-command/per-pipeline latency and
//! error instrumentation. The wrapper is transparent: it observes and gates
//! the protocol but never alters commands or results.

pub mod client;
pub mod error;
pub mod gate;
pub mod hook;
pub mod pipeline;
pub mod stats;
pub mod topology;

pub use client::RedisStore;
pub use error::StoreError;
pub use gate::{AdmissionGate, OpKind};
pub use hook::{CommandHook, OpToken, SlowOrError};
pub use pipeline::StorePipeline;
pub use stats::StoreStats;
pub use topology::TopologyKind;
