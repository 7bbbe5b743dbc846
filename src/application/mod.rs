//! Application layer - session setup and call event handling
//!
//! The controller sequences the setup stages; after setup, the engine drives
//! the dispatcher, which delegates to the auto-answer policy, the call state
//! tracker and the media router.

pub mod account_registrar;
pub mod auto_answer;
pub mod call_tracker;
pub mod context;
pub mod dispatcher;
pub mod media_router;
pub mod session;
pub mod transport_binder;

pub use account_registrar::AccountRegistrar;
pub use auto_answer::{AnswerOutcome, AutoAnswerPolicy};
pub use call_tracker::CallStateTracker;
pub use context::SessionContext;
pub use dispatcher::CallEventDispatcher;
pub use media_router::{MediaAction, MediaRouter, MediaRouting};
pub use session::{AgentHandle, SessionController, SessionOptions};
pub use transport_binder::TransportBinder;
