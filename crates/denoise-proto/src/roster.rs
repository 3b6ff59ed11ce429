//! Client-side roster: which channels this connection is in, and who else is.
//!
//! [`Roster::apply`] follows the server's view from the messages it sends
//! (`001`, `005`, `353`, JOIN, PART, KICK, QUIT, NICK). Keys are folded with
//! the server's casemapping; when `005` changes the mapping every key is
//! refolded.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::casemap::CaseMapping;
use crate::chan::{ChannelExt, DEFAULT_CHANTYPES};
use crate::message::Message;
use crate::prefix::Prefix;

const RPL_WELCOME: u16 = 1;
const RPL_ISUPPORT: u16 = 5;
const RPL_NAMREPLY: u16 = 353;

/// A channel member as last seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Nickname with its original case.
    pub nick: String,
    /// Username, if any message carried it.
    pub user: Option<String>,
    /// Hostname, if any message carried it.
    pub host: Option<String>,
}

impl Member {
    fn from_prefix(nick: &str, prefix: Option<&Prefix>) -> Self {
        Member {
            nick: nick.to_owned(),
            user: prefix.and_then(Prefix::user).map(str::to_owned),
            host: prefix
                .filter(|p| matches!(p, Prefix::Nickname(..)))
                .and_then(Prefix::host)
                .map(str::to_owned),
        }
    }

    fn learn(&mut self, other: Member) {
        self.nick = other.nick;
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.host.is_some() {
            self.host = other.host;
        }
    }
}

/// One joined channel.
#[derive(Clone, Debug)]
pub struct ChannelRoster {
    name: String,
    members: HashMap<String, Member>,
}

impl ChannelRoster {
    /// Channel name as the server first sent it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a member by folded nickname.
    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    /// Number of known members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no members are known.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Authoritative channel/member list for one connection.
#[derive(Clone, Debug)]
pub struct Roster {
    me: Option<String>,
    registered: bool,
    casemapping: CaseMapping,
    chantypes: String,
    /// Membership prefix symbols from `PREFIX=`, stripped from NAMES entries.
    prefix_symbols: String,
    channels: HashMap<String, ChannelRoster>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    /// An empty roster with protocol defaults.
    pub fn new() -> Self {
        Roster {
            me: None,
            registered: false,
            casemapping: CaseMapping::default(),
            chantypes: DEFAULT_CHANTYPES.to_owned(),
            prefix_symbols: "~&@%+".to_owned(),
            channels: HashMap::new(),
        }
    }

    /// Our own nickname, once known.
    pub fn me(&self) -> Option<&str> {
        self.me.as_deref()
    }

    /// Whether RPL_WELCOME has been seen.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// The server's casemapping.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// Fold a nickname or channel name into its lookup key.
    pub fn fold(&self, name: &str) -> String {
        self.casemapping.fold(name)
    }

    /// Whether `nick` is our own nickname.
    pub fn is_me(&self, nick: &str) -> bool {
        self.me
            .as_deref()
            .is_some_and(|me| self.casemapping.irc_eq(me, nick))
    }

    /// Whether `target` names a channel under the advertised CHANTYPES.
    pub fn is_channel(&self, target: &str) -> bool {
        target.is_channel_name_with(&self.chantypes)
    }

    /// Look up a joined channel.
    pub fn channel(&self, name: &str) -> Option<&ChannelRoster> {
        self.channels.get(&self.fold(name))
    }

    /// Iterate joined channels.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelRoster> {
        self.channels.values()
    }

    /// Names of the joined channels `nick` is a member of.
    pub fn channels_of(&self, nick: &str) -> Vec<String> {
        let key = self.fold(nick);
        let mut names: Vec<String> = self
            .channels
            .values()
            .filter(|c| c.members.contains_key(&key))
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Look up a member of a joined channel.
    pub fn member(&self, channel: &str, nick: &str) -> Option<&Member> {
        self.channel(channel)?.member(&self.fold(nick))
    }

    /// Update the roster from one server message.
    pub fn apply(&mut self, msg: &Message) {
        match msg.numeric() {
            Some(RPL_WELCOME) => return self.on_welcome(msg),
            Some(RPL_ISUPPORT) => return self.on_isupport(msg),
            Some(RPL_NAMREPLY) => return self.on_names(msg),
            Some(_) => return,
            None => {}
        }

        let Some(source) = msg.source_nickname() else {
            return;
        };
        let source = source.to_owned();

        match msg.command.to_ascii_uppercase().as_str() {
            "JOIN" => {
                if let Some(chans) = msg.arg(0) {
                    for chan in chans.split(',') {
                        self.on_join(chan, &source, msg.prefix.as_ref());
                    }
                }
            }
            "PART" => {
                if let Some(chans) = msg.arg(0) {
                    for chan in chans.split(',') {
                        self.on_leave(chan, &source);
                    }
                }
            }
            "KICK" => {
                if let (Some(chan), Some(victim)) = (msg.arg(0), msg.arg(1)) {
                    self.on_leave(chan, victim);
                }
            }
            "QUIT" => self.on_quit(&source),
            "NICK" => {
                if let Some(new) = msg.arg(0) {
                    self.on_nick(&source, new);
                }
            }
            _ => {}
        }
    }

    fn on_welcome(&mut self, msg: &Message) {
        if let Some(nick) = msg.arg(0) {
            debug!(nick = %nick, "Registered with server");
            self.me = Some(nick.to_owned());
        }
        self.registered = true;
    }

    fn on_isupport(&mut self, msg: &Message) {
        // First param is our nick, last is the human-readable trailer.
        let end = msg.params.len().saturating_sub(1);
        for token in msg.params.iter().take(end).skip(1) {
            let (key, value) = token.split_once('=').unwrap_or((token.as_str(), ""));
            match key {
                "CASEMAPPING" => match value.parse::<CaseMapping>() {
                    Ok(cm) => self.set_casemapping(cm),
                    Err(other) => debug!(casemapping = %other, "Unknown casemapping, keeping current"),
                },
                "CHANTYPES" if !value.is_empty() => self.chantypes = value.to_owned(),
                "PREFIX" => {
                    if let Some((_, symbols)) = value.split_once(')') {
                        self.prefix_symbols = symbols.to_owned();
                    }
                }
                _ => {}
            }
        }
    }

    fn set_casemapping(&mut self, cm: CaseMapping) {
        if cm == self.casemapping {
            return;
        }
        debug!(casemapping = cm.as_str(), "Server casemapping changed, refolding roster");
        self.casemapping = cm;
        let channels = std::mem::take(&mut self.channels);
        for (_, mut chan) in channels {
            let members = std::mem::take(&mut chan.members);
            chan.members = members
                .into_values()
                .map(|m| (cm.fold(&m.nick), m))
                .collect();
            self.channels.insert(cm.fold(&chan.name), chan);
        }
    }

    fn on_names(&mut self, msg: &Message) {
        let (Some(chan), Some(names)) = (msg.arg(2), msg.arg(3)) else {
            return;
        };
        let key = self.fold(chan);
        let cm = self.casemapping;
        let symbols = self.prefix_symbols.clone();
        let Some(channel) = self.channels.get_mut(&key) else {
            trace!(channel = %chan, "NAMES for a channel we are not in");
            return;
        };
        for entry in names.split(' ').filter(|e| !e.is_empty()) {
            let entry = entry.trim_start_matches(|c: char| symbols.contains(c));
            let prefix = Prefix::new_from_str(entry);
            let Some(nick) = prefix.nick() else { continue };
            let member = Member::from_prefix(nick, Some(&prefix));
            upsert(&mut channel.members, cm.fold(nick), member);
        }
    }

    fn on_join(&mut self, chan: &str, nick: &str, prefix: Option<&Prefix>) {
        let key = self.fold(chan);
        if self.is_me(nick) {
            self.channels.entry(key.clone()).or_insert_with(|| ChannelRoster {
                name: chan.to_owned(),
                members: HashMap::new(),
            });
        }
        let nick_key = self.fold(nick);
        if let Some(channel) = self.channels.get_mut(&key) {
            upsert(&mut channel.members, nick_key, Member::from_prefix(nick, prefix));
        }
    }

    fn on_leave(&mut self, chan: &str, nick: &str) {
        let key = self.fold(chan);
        if self.is_me(nick) {
            self.channels.remove(&key);
            return;
        }
        let nick_key = self.fold(nick);
        if let Some(channel) = self.channels.get_mut(&key) {
            channel.members.remove(&nick_key);
        }
    }

    fn on_quit(&mut self, nick: &str) {
        if self.is_me(nick) {
            self.channels.clear();
            return;
        }
        let key = self.fold(nick);
        for channel in self.channels.values_mut() {
            channel.members.remove(&key);
        }
    }

    fn on_nick(&mut self, old: &str, new: &str) {
        if self.is_me(old) {
            self.me = Some(new.to_owned());
        }
        let old_key = self.fold(old);
        let new_key = self.fold(new);
        for channel in self.channels.values_mut() {
            if let Some(mut member) = channel.members.remove(&old_key) {
                member.nick = new.to_owned();
                channel.members.insert(new_key.clone(), member);
            }
        }
    }
}

fn upsert(members: &mut HashMap<String, Member>, key: String, member: Member) {
    match members.get_mut(&key) {
        Some(existing) => existing.learn(member),
        None => {
            members.insert(key, member);
        }
    }
}
