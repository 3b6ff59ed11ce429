//! Server message handlers.
//!
//! Only presence churn and channel messages are inspected. Every other
//! command falls through the [`Registry`] untouched.

mod channel;
mod connection;
mod core;
mod messaging;

pub use self::channel::{JoinHandler, KickHandler, PartHandler};
pub use self::connection::{NickHandler, QuitHandler};
pub use self::core::{Context, Handler, Outcome, Registry, Timing};
pub use self::messaging::PrivmsgHandler;
