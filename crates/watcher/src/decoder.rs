//! Decoder for the packed `struct inotify_event` stream
//!
//! Layout of one record, all fields in native byte order:
//!
//! ```text
//! +--------+--------+--------+--------+----------------------+
//! | wd i32 |mask u32|cookie  | len u32| name[len], NUL padded|
//! +--------+--------+--------+--------+----------------------+
//! ```

use crate::error::{Error, Result};
use crate::event::{Event, WatchId};
use crate::mask::EventMask;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

/// Size of the fixed record header
pub const HEADER_SIZE: usize = 16;

/// Longest name the kernel will put in a record, without its NUL
pub const NAME_MAX: usize = 255;

/// Iterator over the records in one read buffer
///
/// Yields `Err(Truncated)` once and then stops if the buffer ends inside a
/// record.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Decoder<'a> {
    /// Start decoding at the beginning of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    /// Bytes consumed by the records decoded so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet decoded
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }

        match decode_record(&self.buf[self.offset..]) {
            Ok((event, consumed)) => {
                self.offset += consumed;
                Some(Ok(event))
            }
            Err(Error::Truncated {
                offset,
                needed,
                available,
            }) => {
                self.failed = true;
                Some(Err(Error::Truncated {
                    offset: self.offset + offset,
                    needed,
                    available,
                }))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Decode every record in `buf`
///
/// An empty buffer is an empty result, not an error.
pub fn decode(buf: &[u8]) -> Result<Vec<Event>> {
    Decoder::new(buf).collect()
}

/// Decode the record at the start of `buf`
///
/// Returns the event and the number of bytes it occupied. `buf` must hold
/// at least the header plus the declared name length.
pub fn decode_record(buf: &[u8]) -> Result<(Event, usize)> {
    if buf.len() < HEADER_SIZE {
        return Err(Error::Truncated {
            offset: 0,
            needed: HEADER_SIZE,
            available: buf.len(),
        });
    }

    let wd = i32::from_ne_bytes(field(buf, 0));
    let mask = u32::from_ne_bytes(field(buf, 4));
    let cookie = u32::from_ne_bytes(field(buf, 8));
    let name_len = u32::from_ne_bytes(field(buf, 12));

    let total = usize::try_from(name_len)
        .ok()
        .and_then(|len| HEADER_SIZE.checked_add(len))
        .unwrap_or(usize::MAX);
    if buf.len() < total {
        return Err(Error::Truncated {
            offset: 0,
            needed: total,
            available: buf.len(),
        });
    }

    let raw_name = &buf[HEADER_SIZE..total];
    let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
    let name = (end > 0).then(|| OsStr::from_bytes(&raw_name[..end]).to_os_string());

    let event = Event {
        watch_id: WatchId::from_raw(wd),
        mask: EventMask::from_bits_retain(mask),
        cookie,
        name_len,
        name,
        watch_path: None,
    };
    Ok((event, total))
}

fn field(buf: &[u8], at: usize) -> [u8; 4] {
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}

/// Encode a record the way the kernel lays it out
///
/// The name is NUL terminated and padded to a multiple of the header
/// alignment. Used to build fixtures for the decoder.
pub fn encode_record(wd: i32, mask: EventMask, cookie: u32, name: Option<&OsStr>) -> Vec<u8> {
    let name_bytes = name.map(OsStr::as_bytes).unwrap_or_default();
    let name_len = if name_bytes.is_empty() {
        0
    } else {
        (name_bytes.len() + 1).next_multiple_of(HEADER_SIZE)
    };

    let mut record = Vec::with_capacity(HEADER_SIZE + name_len);
    record.extend_from_slice(&wd.to_ne_bytes());
    record.extend_from_slice(&mask.bits().to_ne_bytes());
    record.extend_from_slice(&cookie.to_ne_bytes());
    record.extend_from_slice(&(name_len as u32).to_ne_bytes());
    record.extend_from_slice(name_bytes);
    record.resize(HEADER_SIZE + name_len, 0);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn os(bytes: &[u8]) -> &OsStr {
        OsStr::from_bytes(bytes)
    }

    #[test]
    fn test_empty_buffer_decodes_to_nothing() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_record_without_name() {
        let buf = encode_record(3, EventMask::DELETE_SELF, 0, None);
        assert_eq!(buf.len(), HEADER_SIZE);

        let events = decode(&buf).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].watch_id, WatchId::from_raw(3));
        assert_eq!(events[0].mask, EventMask::DELETE_SELF);
        assert_eq!(events[0].name_len, 0);
        assert_eq!(events[0].name, None);
        assert_eq!(events[0].watch_path, None);
    }

    #[test]
    fn test_concatenated_records_keep_order_and_names() {
        let mut buf = Vec::new();
        buf.extend(encode_record(1, EventMask::CREATE, 0, Some(os(b"a"))));
        buf.extend(encode_record(1, EventMask::MOVED_FROM, 42, Some(os(b"exactly-16-bytes"))));
        buf.extend(encode_record(2, EventMask::MOVED_TO, 42, Some(os(b"renamed.txt"))));
        buf.extend(encode_record(2, EventMask::IGNORED, 0, None));

        let events = decode(&buf).unwrap();
        assert_eq!(events.len(), 4);

        assert_eq!(events[0].name.as_deref(), Some(os(b"a")));
        assert_eq!(events[0].name_len, 16);
        assert_eq!(events[1].name.as_deref(), Some(os(b"exactly-16-bytes")));
        assert_eq!(events[1].name_len, 32);
        assert_eq!(events[1].cookie, 42);
        assert_eq!(events[2].name.as_deref(), Some(os(b"renamed.txt")));
        assert_eq!(events[2].watch_id, WatchId::from_raw(2));
        assert_eq!(events[3].mask, EventMask::IGNORED);
        assert_eq!(events[3].name, None);
    }

    #[test]
    fn test_non_utf8_name_round_trips() {
        let raw: &[u8] = b"\xff\xfe-not-\xc3(utf8";
        let buf = encode_record(5, EventMask::MODIFY, 0, Some(os(raw)));

        let events = decode(&buf).unwrap();
        let name: &OsString = events[0].name.as_ref().unwrap();
        assert_eq!(name.as_bytes(), raw);
    }

    #[test]
    fn test_overflow_record_has_negative_id() {
        let buf = encode_record(-1, EventMask::Q_OVERFLOW, 0, None);
        let events = decode(&buf).unwrap();
        assert_eq!(events[0].watch_id.as_raw(), -1);
    }

    #[test]
    fn test_unknown_mask_bits_survive() {
        let mask = EventMask::from_bits_retain(0x0800_0000 | EventMask::OPEN.bits());
        let events = decode(&encode_record(1, mask, 0, None)).unwrap();
        assert_eq!(events[0].mask.bits(), 0x0800_0020);
    }

    #[test]
    fn test_partial_header_is_truncated() {
        let buf = encode_record(1, EventMask::CREATE, 0, None);
        let err = decode(&buf[..10]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated { offset: 0, needed: HEADER_SIZE, available: 10 }
        ));
    }

    #[test]
    fn test_short_name_is_truncated_at_record_offset() {
        let mut buf = encode_record(1, EventMask::CREATE, 0, None);
        let second = encode_record(1, EventMask::CREATE, 0, Some(os(b"name")));
        buf.extend_from_slice(&second[..HEADER_SIZE + 4]);

        let mut decoder = Decoder::new(&buf);
        assert!(decoder.next().unwrap().is_ok());
        let err = decoder.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated { offset: HEADER_SIZE, needed: 32, available: 20 }
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_oversized_name_length_is_truncated() {
        let mut buf = encode_record(1, EventMask::CREATE, 0, None);
        buf[12..16].copy_from_slice(&u32::MAX.to_ne_bytes());

        match decode(&buf).unwrap_err() {
            Error::Truncated { offset, needed, available } => {
                assert_eq!(offset, 0);
                assert!(needed > available);
                assert_eq!(available, HEADER_SIZE);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_decoder_tracks_offset() {
        let mut buf = encode_record(1, EventMask::CREATE, 0, Some(os(b"x")));
        buf.extend(encode_record(1, EventMask::DELETE, 0, None));

        let mut decoder = Decoder::new(&buf);
        decoder.next().unwrap().unwrap();
        assert_eq!(decoder.offset(), 32);
        assert_eq!(decoder.remaining().len(), HEADER_SIZE);
    }
}
