//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - The signaling engine boundary and the in-process engine
//! - The conference bridge used for audio routing
//! - Observability sinks (tracing, metrics, in-memory)

pub mod engine;
pub mod media;
pub mod observability;
