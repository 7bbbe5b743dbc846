//! Shared kernel - types used by the session, call and engine layers

pub mod error;
pub mod result;
pub mod value_objects;

pub use error::{CallError, EngineError, SessionError};
pub use result::Result;
pub use value_objects::*;
