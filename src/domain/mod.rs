//! Domain layer - session and call model
//!
//! This layer contains:
//! - Agent lifecycle and setup stages
//! - Transport and account configuration value objects
//! - The call record mirrored from engine events
//! - Session events and errors

pub mod account;
pub mod agent;
pub mod call;
pub mod shared;
pub mod transport;

// Re-export commonly used types
pub use account::{AccountConfig, Credential, SecretKind};
pub use agent::{AgentState, LogLevel, SetupStage};
pub use shared::{CallError, EngineError, Result, SessionError};
pub use transport::{TransportConfig, TransportProtocol};
