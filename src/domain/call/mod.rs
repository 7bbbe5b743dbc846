//! Call bounded context - per-call signaling and media state

pub mod aggregate;
pub mod entity;
pub mod event;
pub mod value_object;

pub use aggregate::CallRecord;
pub use entity::CallInfo;
pub use event::{SessionEvent, SetupWarning};
pub use value_object::{MediaState, SignalingState};
