//! Handler context and core types.

use std::time::Instant;

use denoise_proto::{Message, Roster};

use crate::denoise::{self, Churn, DenoiseSettings, PresenceTracker, UserActivity, Verdict};

/// What the session does with the original server message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Send the original line, then anything queued.
    Relay,
    /// The original is consumed; only queued messages are sent.
    Handled,
}

/// When a handler runs relative to the roster update for the same message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    BeforeRoster,
    AfterRoster,
}

/// A server-message handler.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome;
}

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Roster as seen by this connection.
    pub roster: &'a mut Roster,
    /// Denoise side table.
    pub tracker: &'a mut PresenceTracker,
    pub settings: &'a DenoiseSettings,
    /// Event time for every decision taken on this message.
    pub now: Instant,
    /// Messages to send to the client, in order.
    pub outbox: Vec<Message>,
}

impl<'a> Context<'a> {
    pub fn new(
        roster: &'a mut Roster,
        tracker: &'a mut PresenceTracker,
        settings: &'a DenoiseSettings,
        now: Instant,
    ) -> Self {
        Self {
            roster,
            tracker,
            settings,
            now,
            outbox: Vec::new(),
        }
    }

    /// Decide a churn event against a record.
    pub fn decide(&self, record: Option<&UserActivity>) -> Verdict {
        denoise::decide(record, self.now, self.settings.arm_window)
    }

    pub fn is_armed(&self, record: &UserActivity) -> bool {
        denoise::is_armed(record, self.now, self.settings.arm_window)
    }

    /// Queue the announcement for a forwarded event.
    pub fn forward(&mut self, event: &Churn<'_>) {
        let rendered = denoise::render(event, &self.settings.announcer);
        self.outbox.push(rendered);
    }

    /// Record that `nick` left `channel`.
    ///
    /// Unarmed records are dropped now. Armed ones are kept, minus their
    /// join markers, so a quick rejoin is still forwarded.
    pub fn retire(&mut self, channel: &str, nick: &str) {
        let now = self.now;
        let window = self.settings.arm_window;
        let Some(record) = self.tracker.lookup_mut(channel, nick) else {
            return;
        };
        if denoise::is_armed(record, now, window) {
            record.left();
        } else {
            self.tracker.remove_user(channel, nick);
        }
    }
}
