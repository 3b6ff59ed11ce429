//! Network module.
//!
//! Contains the Gateway (TCP listener) and the client Session with its
//! event loop.

mod event_loop;
mod gateway;
mod session;

pub use event_loop::HOUSEKEEPING_INTERVAL;
pub use gateway::Gateway;
pub use session::{MAX_CLIENT_LINE, Session, SessionPhase};
