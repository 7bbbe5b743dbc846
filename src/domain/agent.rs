//! Agent lifecycle - the single signaling engine instance a session owns

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the engine's agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    Uninitialized,
    Created,
    Configured,
    Started,
    Destroyed,
}

impl AgentState {
    /// Whether `destroy` is meaningful from this state
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AgentState::Created | AgentState::Configured | AgentState::Started
        )
    }

    /// State name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::Uninitialized => "Uninitialized",
            AgentState::Created => "Created",
            AgentState::Configured => "Configured",
            AgentState::Started => "Started",
            AgentState::Destroyed => "Destroyed",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Setup stages, in the order the controller runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupStage {
    AgentCreate,
    UriVerify,
    AgentInit,
    TransportCreate,
    AgentStart,
    AccountAdd,
}

impl SetupStage {
    pub const ALL: [SetupStage; 6] = [
        SetupStage::AgentCreate,
        SetupStage::UriVerify,
        SetupStage::AgentInit,
        SetupStage::TransportCreate,
        SetupStage::AgentStart,
        SetupStage::AccountAdd,
    ];

    /// Stage name used in `"Error in <stage>"`
    pub fn name(&self) -> &'static str {
        match self {
            SetupStage::AgentCreate => "AgentCreate",
            SetupStage::UriVerify => "UriVerify",
            SetupStage::AgentInit => "AgentInit",
            SetupStage::TransportCreate => "TransportCreate",
            SetupStage::AgentStart => "AgentStart",
            SetupStage::AccountAdd => "AccountAdd",
        }
    }

    /// Whether a failure at this stage leaves an agent that must be destroyed
    pub fn requires_rollback(&self) -> bool {
        !matches!(self, SetupStage::AgentCreate)
    }
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine console verbosity, 0 (fatal only) to 6 (very detailed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(u8);

impl LogLevel {
    pub const MAX: u8 = 6;

    /// Console level, clamped to [`LogLevel::MAX`]
    pub fn new(level: u8) -> Self {
        Self(level.min(Self::MAX))
    }

    /// Numeric level
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Closest `tracing` level for this verbosity
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self.0 {
            0 | 1 => tracing::Level::ERROR,
            2 => tracing::Level::WARN,
            3 => tracing::Level::INFO,
            4 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(4)
    }
}
