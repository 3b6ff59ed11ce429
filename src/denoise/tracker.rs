//! Presence tracker: per-channel activity records for other users.
//!
//! A [`ChannelState`] exists exactly while we occupy the channel. Records
//! inside it are keyed by the folded nickname and are only reachable through
//! that one channel. Desync (an event for a channel we do not track) is
//! logged and skipped by every operation; nothing here is fatal.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use denoise_proto::{CaseMapping, Roster};
use tracing::{debug, trace};

use super::policy;

/// What we know about one user in one channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserActivity {
    /// Last channel message from this user. Never moves backwards.
    pub last_spoke_at: Option<Instant>,
    /// Most recent observed JOIN.
    pub joined_at: Option<Instant>,
    /// Set on JOIN, cleared by the first message after it.
    pub quiet_since_join: bool,
}

impl UserActivity {
    /// Record a channel message at `now`.
    pub fn spoke(&mut self, now: Instant) {
        self.last_spoke_at = Some(self.last_spoke_at.map_or(now, |prev| prev.max(now)));
        self.quiet_since_join = false;
    }

    /// Record a JOIN at `now`.
    pub fn joined(&mut self, now: Instant) {
        self.joined_at = Some(now);
        self.quiet_since_join = true;
    }

    /// Forget join markers after the user left. Speaking history is kept.
    pub fn left(&mut self) {
        self.joined_at = None;
        self.quiet_since_join = false;
    }
}

/// Tracking state for one channel we occupy.
#[derive(Clone, Debug)]
pub struct ChannelState {
    name: String,
    members: HashMap<String, UserActivity>,
}

impl ChannelState {
    fn new(name: &str) -> Self {
        ChannelState {
            name: name.to_owned(),
            members: HashMap::new(),
        }
    }

    /// Channel name as first seen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Side table of denoise state, keyed by folded channel name.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    casemapping: CaseMapping,
    channels: HashMap<String, ChannelState>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Casemapping used for folding keys.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// Switch casemapping, refolding every key.
    pub fn set_casemapping(&mut self, cm: CaseMapping) {
        if cm == self.casemapping {
            return;
        }
        self.casemapping = cm;
        let channels = std::mem::take(&mut self.channels);
        for (_, mut state) in channels {
            // Nick keys are folded already; folding again under the new
            // mapping is the best available without the original case.
            state.members = std::mem::take(&mut state.members)
                .into_iter()
                .map(|(nick, record)| (cm.fold(&nick), record))
                .collect();
            self.channels.insert(cm.fold(&state.name), state);
        }
    }

    fn fold(&self, name: &str) -> String {
        self.casemapping.fold(name)
    }

    /// Start tracking a channel we just joined. Returns `false` if it was
    /// already tracked.
    pub fn add_channel(&mut self, channel: &str) -> bool {
        let key = self.fold(channel);
        if self.channels.contains_key(&key) {
            return false;
        }
        debug!(channel = %channel, "Tracking channel");
        self.channels.insert(key, ChannelState::new(channel));
        true
    }

    /// Stop tracking a channel, releasing every record in it.
    pub fn remove_channel(&mut self, channel: &str) -> Option<ChannelState> {
        let removed = self.channels.remove(&self.fold(channel));
        match &removed {
            Some(state) => debug!(channel = %state.name, records = state.len(), "Released channel"),
            None => debug!(channel = %channel, "Desync: release of untracked channel"),
        }
        removed
    }

    /// Release every channel. Returns how many were tracked.
    pub fn clear(&mut self) -> usize {
        let count = self.channels.len();
        self.channels.clear();
        count
    }

    /// Whether `channel` is tracked.
    pub fn is_tracked(&self, channel: &str) -> bool {
        self.channels.contains_key(&self.fold(channel))
    }

    /// Tracked channel state.
    pub fn channel(&self, channel: &str) -> Option<&ChannelState> {
        self.channels.get(&self.fold(channel))
    }

    /// Number of tracked channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total records across all channels.
    pub fn record_count(&self) -> usize {
        self.channels.values().map(ChannelState::len).sum()
    }

    /// Existing record for `nick` in `channel`, or a fresh one.
    ///
    /// Returns `None` when the channel is not tracked.
    pub fn get_or_create(&mut self, channel: &str, nick: &str) -> Option<&mut UserActivity> {
        let nick_key = self.fold(nick);
        let Some(state) = self.channels.get_mut(&self.fold(channel)) else {
            debug!(channel = %channel, nick = %nick, "Desync: record for untracked channel");
            return None;
        };
        Some(state.members.entry(nick_key).or_insert_with(|| {
            trace!(channel = %channel, nick = %nick, "New activity record");
            UserActivity::default()
        }))
    }

    pub fn lookup(&self, channel: &str, nick: &str) -> Option<&UserActivity> {
        self.channels
            .get(&self.fold(channel))?
            .members
            .get(&self.fold(nick))
    }

    pub fn lookup_mut(&mut self, channel: &str, nick: &str) -> Option<&mut UserActivity> {
        let nick_key = self.fold(nick);
        self.channels
            .get_mut(&self.fold(channel))?
            .members
            .get_mut(&nick_key)
    }

    /// Drop one record.
    pub fn remove_user(&mut self, channel: &str, nick: &str) -> Option<UserActivity> {
        let nick_key = self.fold(nick);
        self.channels
            .get_mut(&self.fold(channel))?
            .members
            .remove(&nick_key)
    }

    /// Move the record under `old` to `new`. Returns whether a record moved.
    pub fn rename(&mut self, channel: &str, old: &str, new: &str) -> bool {
        let old_key = self.fold(old);
        let new_key = self.fold(new);
        let Some(state) = self.channels.get_mut(&self.fold(channel)) else {
            debug!(channel = %channel, "Desync: rename in untracked channel");
            return false;
        };
        match state.members.remove(&old_key) {
            Some(record) => {
                state.members.insert(new_key, record);
                true
            }
            None => false,
        }
    }

    /// Visit every tracked channel holding a record for `nick`.
    ///
    /// There is no reverse index, so this scans all channels.
    pub fn for_all_channels_of<F>(&mut self, nick: &str, mut f: F)
    where
        F: FnMut(&str, &mut UserActivity),
    {
        let key = self.fold(nick);
        for state in self.channels.values_mut() {
            if let Some(record) = state.members.get_mut(&key) {
                f(&state.name, record);
            }
        }
    }

    /// Drop records that are unarmed and whose user is no longer in the
    /// roster's view of the channel. Returns how many were dropped.
    pub fn sweep(&mut self, now: Instant, window: Duration, roster: &Roster) -> usize {
        let mut dropped = 0;
        for state in self.channels.values_mut() {
            let chan = roster.channel(&state.name);
            state.members.retain(|nick, record| {
                let present = chan.is_some_and(|c| c.member(nick).is_some());
                let keep = present || policy::is_armed(record, now, window);
                if !keep {
                    trace!(channel = %state.name, nick = %nick, "Sweeping record");
                    dropped += 1;
                }
                keep
            });
        }
        dropped
    }

    /// Human-readable dump of every channel and record.
    pub fn snapshot(&self, now: Instant) -> String {
        let mut out = String::new();
        let mut channels: Vec<&ChannelState> = self.channels.values().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));

        let _ = writeln!(
            out,
            "{} channel(s), {} record(s)",
            channels.len(),
            self.record_count()
        );
        for state in channels {
            let _ = writeln!(out, "{} ({} record(s))", state.name, state.len());
            let mut nicks: Vec<(&String, &UserActivity)> = state.members.iter().collect();
            nicks.sort_by(|a, b| a.0.cmp(b.0));
            for (nick, record) in nicks {
                let spoke = record.last_spoke_at.map_or_else(
                    || "never".to_owned(),
                    |t| format!("{}s ago", now.saturating_duration_since(t).as_secs()),
                );
                let _ = writeln!(
                    out,
                    "  {nick}: spoke {spoke}, quiet_since_join={}",
                    record.quiet_since_join
                );
            }
        }
        out
    }
}
