//! Autoanswer - a SIP user agent that answers every call
//!
//! Brings up an agent, binds a transport, registers one account, then
//! answers inbound calls and patches their audio into the sound device.
//! Layered the usual way: domain types, application services driving a
//! signaling engine, infrastructure providing the engine and sinks, and a
//! blocking interface for hosts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use application::{AgentHandle, SessionController, SessionOptions};
pub use domain::shared::error::{CallError, EngineError, SessionError};
pub use domain::shared::result::Result;
pub use infrastructure::engine::{LocalEngine, SignalingEngine};
pub use interface::SessionHost;
