//! Event mask vocabulary
//!
//! Bit values follow `<sys/inotify.h>`. They are identical on every Linux
//! architecture, so they are spelled out here instead of pulled from `libc`,
//! which keeps decoding usable on hosts without inotify.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Set of inotify event and watch-option bits
    ///
    /// Masks decoded from the kernel are built with `from_bits_retain`, so bits
    /// this table does not know about survive untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EventMask: u32 {
        /// File was accessed
        const ACCESS = 0x0000_0001;
        /// File was modified
        const MODIFY = 0x0000_0002;
        /// Metadata changed
        const ATTRIB = 0x0000_0004;
        /// Writable file was closed
        const CLOSE_WRITE = 0x0000_0008;
        /// Unwritable file was closed
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened
        const OPEN = 0x0000_0020;
        /// File was moved out of a watched directory
        const MOVED_FROM = 0x0000_0040;
        /// File was moved into a watched directory
        const MOVED_TO = 0x0000_0080;
        /// File was created in a watched directory
        const CREATE = 0x0000_0100;
        /// File was deleted from a watched directory
        const DELETE = 0x0000_0200;
        /// The watched path itself was deleted
        const DELETE_SELF = 0x0000_0400;
        /// The watched path itself was moved
        const MOVE_SELF = 0x0000_0800;

        /// Backing filesystem was unmounted
        const UNMOUNT = 0x0000_2000;
        /// Event queue overflowed
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed, explicitly or by the kernel
        const IGNORED = 0x0000_8000;

        /// Only watch the path if it is a directory
        const ONLYDIR = 0x0100_0000;
        /// Do not follow a trailing symlink
        const DONT_FOLLOW = 0x0200_0000;
        /// Drop events for children after they are unlinked
        const EXCL_UNLINK = 0x0400_0000;
        /// Fail with `EEXIST` if the path is already watched
        const MASK_CREATE = 0x1000_0000;
        /// Merge into an existing watch mask instead of replacing it
        const MASK_ADD = 0x2000_0000;
        /// Subject of the event is a directory
        const ISDIR = 0x4000_0000;
        /// Remove the watch after the first event
        const ONESHOT = 0x8000_0000;

        const CLOSE = Self::CLOSE_WRITE.bits() | Self::CLOSE_NOWRITE.bits();
        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
        const ALL_EVENTS = 0x0000_0fff;
    }
}

/// Individually meaningful bits and their symbolic names, in rendering order
pub const VOCABULARY: &[(EventMask, &str)] = &[
    (EventMask::ACCESS, "IN_ACCESS"),
    (EventMask::MODIFY, "IN_MODIFY"),
    (EventMask::ATTRIB, "IN_ATTRIB"),
    (EventMask::CLOSE_WRITE, "IN_CLOSE_WRITE"),
    (EventMask::CLOSE_NOWRITE, "IN_CLOSE_NOWRITE"),
    (EventMask::OPEN, "IN_OPEN"),
    (EventMask::MOVED_FROM, "IN_MOVED_FROM"),
    (EventMask::MOVED_TO, "IN_MOVED_TO"),
    (EventMask::CREATE, "IN_CREATE"),
    (EventMask::DELETE, "IN_DELETE"),
    (EventMask::DELETE_SELF, "IN_DELETE_SELF"),
    (EventMask::MOVE_SELF, "IN_MOVE_SELF"),
    (EventMask::UNMOUNT, "IN_UNMOUNT"),
    (EventMask::Q_OVERFLOW, "IN_Q_OVERFLOW"),
    (EventMask::IGNORED, "IN_IGNORED"),
    (EventMask::ONLYDIR, "IN_ONLYDIR"),
    (EventMask::DONT_FOLLOW, "IN_DONT_FOLLOW"),
    (EventMask::EXCL_UNLINK, "IN_EXCL_UNLINK"),
    (EventMask::MASK_CREATE, "IN_MASK_CREATE"),
    (EventMask::MASK_ADD, "IN_MASK_ADD"),
    (EventMask::ISDIR, "IN_ISDIR"),
    (EventMask::ONESHOT, "IN_ONESHOT"),
];

/// Names of every vocabulary bit set in `mask`, in table order
///
/// Bits outside the vocabulary are skipped; use [`format_mask`] to see them.
pub fn event_names(mask: EventMask) -> Vec<&'static str> {
    VOCABULARY
        .iter()
        .filter(|(flag, _)| mask.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
}

/// Render a mask as `IN_A|IN_B`, with any unknown bits appended as hex
pub fn format_mask(mask: EventMask) -> String {
    let mut parts: Vec<String> = event_names(mask).into_iter().map(str::to_owned).collect();

    let known = VOCABULARY
        .iter()
        .fold(0u32, |acc, (flag, _)| acc | flag.bits());
    let unknown = mask.bits() & !known;
    if unknown != 0 {
        parts.push(format!("{unknown:#x}"));
    }

    if parts.is_empty() {
        "0".to_owned()
    } else {
        parts.join("|")
    }
}

/// Mask string contained a token that is neither a flag name nor a number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event mask flag: {token:?}")]
pub struct ParseMaskError {
    pub token: String,
}

/// Parse a textual mask such as `CREATE|DELETE`, `IN_MODIFY,IN_ATTRIB` or `0x300`
///
/// Tokens may be separated by `|`, `,` or whitespace. Names are matched
/// case-insensitively, with or without the `IN_` prefix, and include the
/// composite names `CLOSE`, `MOVE` and `ALL_EVENTS`.
pub fn parse_mask(input: &str) -> Result<EventMask, ParseMaskError> {
    let mut mask = EventMask::empty();

    for token in input
        .split(|c: char| c == '|' || c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        mask |= parse_token(token).ok_or_else(|| ParseMaskError {
            token: token.to_owned(),
        })?;
    }

    Ok(mask)
}

fn parse_token(token: &str) -> Option<EventMask> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(EventMask::from_bits_retain);
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok().map(EventMask::from_bits_retain);
    }

    let upper = token.to_ascii_uppercase();
    let name = upper.strip_prefix("IN_").unwrap_or(&upper);
    EventMask::from_name(name)
}

impl FromStr for EventMask {
    type Err = ParseMaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mask(s)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_mask(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_follow_table_order() {
        let mask = EventMask::ISDIR | EventMask::CREATE | EventMask::ACCESS;
        assert_eq!(event_names(mask), vec!["IN_ACCESS", "IN_CREATE", "IN_ISDIR"]);
    }

    #[test]
    fn test_names_of_empty_mask() {
        assert!(event_names(EventMask::empty()).is_empty());
    }

    #[test]
    fn test_composite_expands_to_members() {
        assert_eq!(
            event_names(EventMask::CLOSE),
            vec!["IN_CLOSE_WRITE", "IN_CLOSE_NOWRITE"]
        );
        assert_eq!(event_names(EventMask::ALL_EVENTS).len(), 12);
    }

    #[test]
    fn test_unknown_bits_are_retained() {
        let mask = EventMask::from_bits_retain(0x0000_1000 | EventMask::MODIFY.bits());
        assert_eq!(mask.bits(), 0x1002);
        assert_eq!(event_names(mask), vec!["IN_MODIFY"]);
        assert_eq!(format_mask(mask), "IN_MODIFY|0x1000");
    }

    #[test]
    fn test_format_empty_mask() {
        assert_eq!(format_mask(EventMask::empty()), "0");
    }

    #[test]
    fn test_vocabulary_entries_are_single_bits() {
        for (flag, name) in VOCABULARY {
            assert_eq!(flag.bits().count_ones(), 1, "{name} is not a single bit");
        }
    }

    #[test]
    fn test_parse_mask_variants() {
        assert_eq!(
            parse_mask("CREATE|DELETE").unwrap(),
            EventMask::CREATE | EventMask::DELETE
        );
        assert_eq!(
            parse_mask("in_modify, IN_ATTRIB").unwrap(),
            EventMask::MODIFY | EventMask::ATTRIB
        );
        assert_eq!(parse_mask("ALL_EVENTS").unwrap(), EventMask::ALL_EVENTS);
        assert_eq!(parse_mask("0x300").unwrap(), EventMask::CREATE | EventMask::DELETE);
        assert_eq!(parse_mask("2").unwrap(), EventMask::MODIFY);
        assert_eq!(parse_mask("").unwrap(), EventMask::empty());
    }

    #[test]
    fn test_parse_mask_rejects_unknown_name() {
        let err = parse_mask("CREATE|WRITTEN").unwrap_err();
        assert_eq!(err.token, "WRITTEN");
    }

    #[test]
    fn test_from_str_and_display() {
        let mask: EventMask = "CREATE|DELETE".parse().unwrap();
        assert_eq!(mask, EventMask::CREATE | EventMask::DELETE);
        assert_eq!(format!("{mask}"), "IN_CREATE|IN_DELETE");
        assert_eq!(mask.to_string().parse::<EventMask>().unwrap(), mask);
        assert!("NOPE".parse::<EventMask>().is_err());
    }
}
