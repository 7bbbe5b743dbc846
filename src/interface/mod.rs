//! Interface layer - the synchronous boundary used by the host application

pub mod boundary;

pub use boundary::{status_of, SessionHost, STATUS_INVALID_STATE, STATUS_OK};
