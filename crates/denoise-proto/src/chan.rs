//! Channel name detection.
//!
//! Servers advertise their channel prefixes through ISUPPORT `CHANTYPES`;
//! until they do, the RFC 2812 set (`#&+!`) applies.

/// Channel prefixes assumed before the server advertises `CHANTYPES`.
pub const DEFAULT_CHANTYPES: &str = "#&+!";

/// Extension trait for telling channel targets apart from nicknames.
pub trait ChannelExt {
    /// Check against the default channel prefixes.
    fn is_channel_name(&self) -> bool {
        self.is_channel_name_with(DEFAULT_CHANTYPES)
    }

    /// Check against an explicit set of channel prefixes.
    ///
    /// The name must start with one of `chantypes` and contain no space,
    /// comma, BEL or NUL.
    fn is_channel_name_with(&self, chantypes: &str) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name_with(&self, chantypes: &str) -> bool {
        let mut chars = self.chars();
        match chars.next() {
            Some(first) if chantypes.contains(first) => {}
            _ => return false,
        }
        chars.all(|c| !matches!(c, ' ' | ',' | '\x07' | '\0'))
    }
}

impl ChannelExt for String {
    fn is_channel_name_with(&self, chantypes: &str) -> bool {
        self.as_str().is_channel_name_with(chantypes)
    }
}
