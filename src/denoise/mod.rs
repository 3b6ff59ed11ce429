//! Denoise engine: activity tracking and the forward/suppress decision.

pub mod policy;
pub mod tracker;

use std::time::Duration;

pub use policy::{Actor, Announcer, Churn, Verdict, decide, is_armed, render};
pub use tracker::{ChannelState, PresenceTracker, UserActivity};

/// Settings shared by every handler for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct DenoiseSettings {
    /// How long a message keeps its author armed.
    pub arm_window: Duration,
    /// Identity used for forwarded churn.
    pub announcer: Announcer,
}

impl Default for DenoiseSettings {
    fn default() -> Self {
        DenoiseSettings {
            arm_window: Duration::from_secs(600),
            announcer: Announcer::default(),
        }
    }
}
