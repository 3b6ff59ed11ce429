//! Arm-window decision and rendering of forwarded churn.
//!
//! Forwarded events are announced by a synthetic identity rather than
//! replayed as the user. The client sees, for example:
//!
//! ```text
//! :denoise!denoise@denoise.relay NOTICE #rust :[PART] alice (a@host): bye
//! ```

use std::time::{Duration, Instant};

use denoise_proto::{Message, Prefix};

use super::tracker::UserActivity;

/// Host part of the announcing identity.
pub const ANNOUNCE_HOST: &str = "denoise.relay";

/// Whether a churn event reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Suppress,
}

impl Verdict {
    pub fn is_forward(self) -> bool {
        self == Verdict::Forward
    }
}

/// A user spoke within `window` of `now`. The boundary counts as armed.
pub fn is_armed(record: &UserActivity, now: Instant, window: Duration) -> bool {
    record
        .last_spoke_at
        .is_some_and(|spoke| now.saturating_duration_since(spoke) <= window)
}

/// Decide a churn event. Users with no record are unarmed.
pub fn decide(record: Option<&UserActivity>, now: Instant, window: Duration) -> Verdict {
    match record {
        Some(record) if is_armed(record, now, window) => Verdict::Forward,
        _ => Verdict::Suppress,
    }
}

/// Who a churn event is about, as carried by its source prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor<'a> {
    pub nick: &'a str,
    pub user: Option<&'a str>,
    pub host: Option<&'a str>,
}

impl<'a> Actor<'a> {
    /// Actor named by a message prefix. Server prefixes have no actor.
    pub fn from_prefix(prefix: &'a Prefix) -> Option<Self> {
        Some(Actor {
            nick: prefix.nick()?,
            user: prefix.user(),
            host: match prefix {
                Prefix::Nickname(..) => prefix.host(),
                Prefix::ServerName(_) => None,
            },
        })
    }
}

/// A churn event to announce in one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Churn<'a> {
    Join {
        channel: &'a str,
        actor: Actor<'a>,
    },
    Part {
        channel: &'a str,
        actor: Actor<'a>,
        reason: Option<&'a str>,
    },
    Quit {
        channel: &'a str,
        actor: Actor<'a>,
        reason: Option<&'a str>,
    },
    Nick {
        channel: &'a str,
        old: &'a str,
        new: &'a str,
    },
}

impl Churn<'_> {
    pub fn channel(&self) -> &str {
        match self {
            Churn::Join { channel, .. }
            | Churn::Part { channel, .. }
            | Churn::Quit { channel, .. }
            | Churn::Nick { channel, .. } => *channel,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Churn::Join { .. } => "JOIN",
            Churn::Part { .. } => "PART",
            Churn::Quit { .. } => "QUIT",
            Churn::Nick { .. } => "NICK",
        }
    }

    fn body(&self) -> String {
        match self {
            Churn::Join { actor, .. } => format!("[JOIN] {}", describe(actor)),
            Churn::Part { actor, reason, .. } => {
                format!("[PART] {}{}", describe(actor), with_reason(*reason))
            }
            Churn::Quit { actor, reason, .. } => {
                format!("[QUIT] {}{}", describe(actor), with_reason(*reason))
            }
            Churn::Nick { old, new, .. } => format!("[NICK] {old} -> {new}"),
        }
    }
}

fn describe(actor: &Actor<'_>) -> String {
    match (actor.user, actor.host) {
        (Some(user), Some(host)) => format!("{} ({user}@{host})", actor.nick),
        (None, Some(host)) => format!("{} ({host})", actor.nick),
        _ => actor.nick.to_owned(),
    }
}

fn with_reason(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!(": {reason}"),
        _ => String::new(),
    }
}

/// The synthetic identity that announces forwarded churn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcer {
    prefix: Prefix,
}

impl Announcer {
    pub fn new(name: &str) -> Self {
        Announcer {
            prefix: Prefix::new(name, name, ANNOUNCE_HOST),
        }
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }
}

impl Default for Announcer {
    fn default() -> Self {
        Self::new("denoise")
    }
}

/// Render a forwarded event for the client.
pub fn render(event: &Churn<'_>, announcer: &Announcer) -> Message {
    Message::notice(event.channel(), event.body()).with_prefix(announcer.prefix.clone())
}
