//! State management module.
//!
//! Contains the session manager (shared server state) and the pieces it is
//! built from: session handles, the nickname registry and the topic router.

mod manager;
mod observer;
mod registry;
pub(crate) mod session;
mod topics;

pub use manager::SessionManager;
pub use observer::SessionObserver;
pub use registry::NicknameRegistry;
pub use session::{SessionHandle, SessionId, SessionIdGenerator};
pub use topics::{Topic, TopicRouter};
