//! ircdenoise - an IRC relay that hides presence churn.
//!
//! One client connects to the relay, the relay connects to one server, and
//! everything passes through unchanged except JOIN, PART, QUIT and NICK of
//! users who have not spoken in a channel within the arm window. Those are
//! dropped; churn from recent speakers is announced to the channel by a
//! synthetic `denoise` identity.

pub mod config;
pub mod denoise;
pub mod error;
pub mod handlers;
pub mod network;
pub mod telemetry;
