//! Media plumbing owned by the local engine

pub mod bridge;

pub use bridge::{ConferenceBridge, SlotOwner};
