//! IRC message tokenizing and formatting.
//!
//! The relay inspects a handful of commands and passes everything else
//! through, so [`Message`] is deliberately untyped: a command word plus its
//! parameter list. Formatting a parsed message reproduces the same command,
//! source and parameters, including whether the last parameter was written
//! in trailing (`:`) form.

use std::fmt;
use std::str::FromStr;

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// An owned IRC message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Raw IRCv3 tag section without the leading `@`. Passed through untouched.
    pub tags: Option<String>,
    /// Message prefix/source.
    pub prefix: Option<Prefix>,
    /// Command word or three-digit numeric, as received.
    pub command: String,
    /// Middle and trailing parameters, in order.
    pub params: Vec<String>,
    /// Whether the last parameter is written after a `:`.
    pub trailing: bool,
}

impl Message {
    /// Create a message from a command and its parameters.
    ///
    /// The trailing marker is set only when the last parameter needs it.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let trailing = params.last().is_some_and(|p| needs_trailing(p));
        Message {
            tags: None,
            prefix: None,
            command: command.into(),
            params,
            trailing,
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Force the last parameter into trailing form.
    #[must_use]
    pub fn with_trailing(mut self) -> Self {
        self.trailing = !self.params.is_empty();
        self
    }

    /// Create a NOTICE.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new("NOTICE", [target.into(), text.into()]).with_trailing()
    }

    /// Create an ERROR line, as sent by servers before closing a link.
    pub fn error(reason: impl Into<String>) -> Self {
        Message::new("ERROR", [reason.into()]).with_trailing()
    }

    /// Get a parameter by index.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Case-insensitive check of the command word.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric reply code, if the command is a three-digit numeric.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }
}

fn needs_trailing(param: &str) -> bool {
    param.is_empty() || param.starts_with(':') || param.contains(' ')
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

fn parse(raw: &str) -> Result<Message, MessageParseError> {
    let mut rest = raw.trim_end_matches(['\r', '\n']).trim_start_matches(' ');
    if rest.is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let mut tags = None;
    if let Some(after) = rest.strip_prefix('@') {
        let (t, r) = after
            .split_once(' ')
            .ok_or(MessageParseError::UnterminatedTags)?;
        tags = Some(t.to_owned());
        rest = r.trim_start_matches(' ');
    }

    let mut prefix = None;
    if let Some(after) = rest.strip_prefix(':') {
        let (p, r) = after.split_once(' ').unwrap_or((after, ""));
        if p.is_empty() {
            return Err(MessageParseError::InvalidPrefix(p.to_owned()));
        }
        prefix = Some(Prefix::new_from_str(p));
        rest = r.trim_start_matches(' ');
    }

    let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
    if command.is_empty() {
        return Err(MessageParseError::MissingCommand);
    }

    let mut params = Vec::new();
    let mut trailing = false;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(t) = rest.strip_prefix(':') {
            params.push(t.to_owned());
            trailing = true;
            break;
        }
        let (p, r) = rest.split_once(' ').unwrap_or((rest, ""));
        params.push(p.to_owned());
        rest = r;
    }

    Ok(Message {
        tags,
        prefix,
        command: command.to_owned(),
        params,
        trailing,
    })
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            write!(f, "@{tags} ")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && (self.trailing || needs_trailing(param)) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}
