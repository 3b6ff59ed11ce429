//! Command handler registry and dispatch.
//!
//! The table is built once and never changes. Each entry says whether its
//! handler must see the roster before or after this message updates it.

use std::collections::HashMap;

use denoise_proto::Message;
use tracing::trace;

use super::context::{Context, Handler, Outcome, Timing};
use crate::handlers::{JoinHandler, KickHandler, NickHandler, PartHandler, PrivmsgHandler, QuitHandler};
use crate::telemetry::spans;

struct Entry {
    handler: Box<dyn Handler>,
    timing: Timing,
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Entry>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };

        // Speaking updates the record before anything else reads it
        registry.insert("PRIVMSG", PrivmsgHandler, Timing::BeforeRoster);

        // Self JOIN needs the roster channel to exist
        registry.insert("JOIN", JoinHandler, Timing::AfterRoster);

        // Departures and renames read state the roster is about to drop
        registry.insert("PART", PartHandler, Timing::BeforeRoster);
        registry.insert("QUIT", QuitHandler, Timing::BeforeRoster);
        registry.insert("NICK", NickHandler, Timing::BeforeRoster);
        registry.insert("KICK", KickHandler, Timing::BeforeRoster);

        registry
    }

    fn insert(&mut self, command: &'static str, handler: impl Handler + 'static, timing: Timing) {
        self.handlers.insert(
            command,
            Entry {
                handler: Box::new(handler),
                timing,
            },
        );
    }

    /// Timing for a registered command.
    pub fn timing(&self, command: &str) -> Option<Timing> {
        self.handlers
            .get(command.to_ascii_uppercase().as_str())
            .map(|entry| entry.timing)
    }

    /// Dispatch one server message.
    ///
    /// The roster is always updated exactly once. Unknown commands are
    /// relayed untouched.
    pub fn dispatch(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let cmd_name = msg.command.to_ascii_uppercase();

        let Some(entry) = self.handlers.get(cmd_name.as_str()) else {
            ctx.roster.apply(msg);
            ctx.tracker.set_casemapping(ctx.roster.casemapping());
            return Outcome::Relay;
        };

        let _span = spans::dispatch(&cmd_name).entered();
        let outcome = match entry.timing {
            Timing::BeforeRoster => {
                let outcome = entry.handler.handle(ctx, msg);
                ctx.roster.apply(msg);
                outcome
            }
            Timing::AfterRoster => {
                ctx.roster.apply(msg);
                entry.handler.handle(ctx, msg)
            }
        };
        trace!(?outcome, queued = ctx.outbox.len(), "Dispatched");
        outcome
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denoise::{DenoiseSettings, PresenceTracker};
    use denoise_proto::Roster;
    use std::time::Instant;

    #[test]
    fn test_table_timings() {
        let registry = Registry::new();
        assert_eq!(registry.timing("join"), Some(Timing::AfterRoster));
        for cmd in ["PRIVMSG", "PART", "QUIT", "NICK", "KICK"] {
            assert_eq!(registry.timing(cmd), Some(Timing::BeforeRoster), "{cmd}");
        }
        assert_eq!(registry.timing("TOPIC"), None);
    }

    #[test]
    fn test_unknown_command_updates_roster_and_relays() {
        let registry = Registry::new();
        let mut roster = Roster::new();
        let mut tracker = PresenceTracker::new();
        let settings = DenoiseSettings::default();
        let mut ctx = Context::new(&mut roster, &mut tracker, &settings, Instant::now());

        let welcome: Message = ":irc.example.org 001 me :Welcome".parse().unwrap();
        assert_eq!(registry.dispatch(&mut ctx, &welcome), Outcome::Relay);
        let topic: Message = ":a!b@c TOPIC #x :new topic".parse().unwrap();
        assert_eq!(registry.dispatch(&mut ctx, &topic), Outcome::Relay);
        assert!(ctx.outbox.is_empty());
        assert!(roster.is_registered());
    }
}
