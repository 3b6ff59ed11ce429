//! # denoise-proto
//!
//! The protocol side of the ircdenoise relay: line framing, a lenient IRC
//! message tokenizer with round-trip formatting, casemapping, and a client
//! side roster that follows channel membership as seen by one connection.
//!
//! ## Parsing and formatting
//!
//! ```rust
//! use denoise_proto::Message;
//!
//! let msg: Message = ":alice!a@host PART #rust :bye".parse().unwrap();
//! assert_eq!(msg.command, "PART");
//! assert_eq!(msg.source_nickname(), Some("alice"));
//! assert_eq!(msg.to_string(), ":alice!a@host PART #rust :bye");
//! ```
//!
//! ## Roster
//!
//! ```rust
//! use denoise_proto::{Message, Roster};
//!
//! let mut roster = Roster::new();
//! roster.apply(&":irc.example 001 me :Welcome".parse::<Message>().unwrap());
//! roster.apply(&":me!u@h JOIN #rust".parse::<Message>().unwrap());
//! assert!(roster.is_me("ME"));
//! assert!(roster.channel("#Rust").is_some());
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
pub mod error;
pub mod irc;
pub mod line;
pub mod message;
pub mod prefix;
pub mod roster;
pub mod transport;
pub mod upstream;

pub use self::casemap::CaseMapping;
pub use self::chan::ChannelExt;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::irc::IrcCodec;
pub use self::line::{LineCodec, RawLineCodec};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::roster::{ChannelRoster, Member, Roster};
pub use self::transport::{LineTransport, Transport, MAX_IRC_LINE_LEN};
pub use self::upstream::{connect, ConnectError, Timeouts};
