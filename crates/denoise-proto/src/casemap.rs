//! IRC case-mapping functions.
//!
//! IRC compares nicknames and channel names case-insensitively, with the
//! exact folding chosen by the server through ISUPPORT `CASEMAPPING`.
//! `rfc1459` additionally treats `[]\~` as the uppercase forms of `{}|^`;
//! `strict-rfc1459` leaves `~`/`^` alone; `ascii` folds only `A-Z`.

use std::str::FromStr;

/// A server casemapping, as advertised in `CASEMAPPING=`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` → `{}|^`. The protocol default.
    #[default]
    Rfc1459,
    /// ASCII plus `[]\` → `{}|`.
    StrictRfc1459,
}

impl CaseMapping {
    /// Fold a single character.
    #[inline]
    pub const fn lower_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => (c as u8 + 32) as char,
            (CaseMapping::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (CaseMapping::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a whole string into its canonical lookup key.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.lower_char(c)).collect()
    }

    /// Compare two strings under this mapping.
    pub fn irc_eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.lower_char(ca) == self.lower_char(cb))
    }

    /// The ISUPPORT token for this mapping.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseMapping::Ascii => "ascii",
            CaseMapping::Rfc1459 => "rfc1459",
            CaseMapping::StrictRfc1459 => "strict-rfc1459",
        }
    }
}

impl FromStr for CaseMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(CaseMapping::Ascii),
            "rfc1459" => Ok(CaseMapping::Rfc1459),
            "strict-rfc1459" => Ok(CaseMapping::StrictRfc1459),
            other => Err(other.to_owned()),
        }
    }
}
