//! Error taxonomy for channel, decoder and waiter operations

use crate::event::Event;
use crate::mask::{format_mask, EventMask};
use crate::WatchId;
use nix::errno::Errno;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type used throughout inwatch
pub type Result<T> = std::result::Result<T, Error>;

/// Everything an inotify operation can fail with
///
/// Variants that come from a failed syscall carry the path the call was
/// about, when there was one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("inotify is not supported on this system")]
    Unsupported,

    #[error("permission denied{}", suffix(.path))]
    PermissionDenied { path: Option<PathBuf> },

    #[error("path is already watched{}", suffix(.path))]
    AlreadyExists { path: Option<PathBuf> },

    #[error("no such file or directory{}", suffix(.path))]
    NotFound { path: Option<PathBuf> },

    #[error("not a directory{}", suffix(.path))]
    NotADirectory { path: Option<PathBuf> },

    #[error("bad file descriptor{}", suffix(.path))]
    BadHandle { path: Option<PathBuf> },

    #[error("invalid argument{}", suffix(.path))]
    InvalidArgument { path: Option<PathBuf> },

    #[error("file name too long{}", suffix(.path))]
    NameTooLong { path: Option<PathBuf> },

    #[error("too many open inotify instances or files{}", suffix(.path))]
    ResourceExhausted { errno: Errno, path: Option<PathBuf> },

    #[error("out of kernel memory{}", suffix(.path))]
    OutOfMemory { path: Option<PathBuf> },

    #[error("inotify watch limit reached{}", suffix(.path))]
    OutOfSpace { path: Option<PathBuf> },

    #[error("inotify channel is closed")]
    Closed,

    #[error("timed out waiting for inotify events")]
    TimedOut,

    #[error("{0}")]
    TerminalEvent(Box<TerminalEvent>),

    #[error("truncated inotify record at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{}{}", os_desc(.code), suffix(.path))]
    Os { code: i32, path: Option<PathBuf> },
}

impl Error {
    /// Translate an errno into its variant, falling back to [`Error::Os`]
    pub fn from_errno(errno: Errno, path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf);
        match errno {
            Errno::ENOSYS => Error::Unsupported,
            Errno::EACCES | Errno::EPERM => Error::PermissionDenied { path },
            Errno::EEXIST => Error::AlreadyExists { path },
            Errno::ENOENT => Error::NotFound { path },
            Errno::ENOTDIR => Error::NotADirectory { path },
            Errno::EBADF => Error::BadHandle { path },
            Errno::EINVAL => Error::InvalidArgument { path },
            Errno::ENAMETOOLONG => Error::NameTooLong { path },
            Errno::EMFILE | Errno::ENFILE => Error::ResourceExhausted { errno, path },
            Errno::ENOMEM => Error::OutOfMemory { path },
            Errno::ENOSPC => Error::OutOfSpace { path },
            other => Error::Os {
                code: other as i32,
                path,
            },
        }
    }

    /// The errno this error was built from, where there is one
    pub fn raw_os_error(&self) -> Option<i32> {
        let errno = match self {
            Error::Unsupported => Errno::ENOSYS,
            Error::PermissionDenied { .. } => Errno::EACCES,
            Error::AlreadyExists { .. } => Errno::EEXIST,
            Error::NotFound { .. } => Errno::ENOENT,
            Error::NotADirectory { .. } => Errno::ENOTDIR,
            Error::BadHandle { .. } => Errno::EBADF,
            Error::InvalidArgument { .. } => Errno::EINVAL,
            Error::NameTooLong { .. } => Errno::ENAMETOOLONG,
            Error::ResourceExhausted { errno, .. } => *errno,
            Error::OutOfMemory { .. } => Errno::ENOMEM,
            Error::OutOfSpace { .. } => Errno::ENOSPC,
            Error::TimedOut => Errno::ETIMEDOUT,
            Error::Os { code, .. } => return Some(*code),
            Error::Closed | Error::TerminalEvent(_) | Error::Truncated { .. } => return None,
        };
        Some(errno as i32)
    }

    /// The terminal event behind this error, if it is one
    pub fn terminal_event(&self) -> Option<&TerminalEvent> {
        match self {
            Error::TerminalEvent(event) => Some(&**event),
            _ => None,
        }
    }
}

fn os_desc(code: &i32) -> &'static str {
    Errno::from_i32(*code).desc()
}

fn suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(": {}", path.display()),
        None => String::new(),
    }
}

/// A record whose mask matched the caller's terminal mask
///
/// Carries the triggering record's context plus every record decoded
/// before it in the same `read_events` call.
#[derive(Debug, Clone)]
pub struct TerminalEvent {
    pub watch_id: WatchId,
    pub mask: EventMask,
    /// Watched path resolved when the event was read
    pub path: Option<PathBuf>,
    pub name: Option<OsString>,
    /// Records that preceded the terminal one
    pub events: Vec<Event>,
}

impl std::fmt::Display for TerminalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "terminal event {} on watch {}", format_mask(self.mask), self.watch_id)?;
        if let Some(path) = &self.path {
            write!(f, " ({}", path.display())?;
            if let Some(name) = &self.name {
                write!(f, "/{}", name.to_string_lossy())?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_table() {
        let path = Path::new("/tmp/watched");
        assert!(matches!(
            Error::from_errno(Errno::EACCES, Some(path)),
            Error::PermissionDenied { path: Some(_) }
        ));
        assert!(matches!(Error::from_errno(Errno::EEXIST, None), Error::AlreadyExists { .. }));
        assert!(matches!(Error::from_errno(Errno::ENOENT, None), Error::NotFound { .. }));
        assert!(matches!(Error::from_errno(Errno::ENOTDIR, None), Error::NotADirectory { .. }));
        assert!(matches!(Error::from_errno(Errno::EBADF, None), Error::BadHandle { .. }));
        assert!(matches!(Error::from_errno(Errno::EINVAL, None), Error::InvalidArgument { .. }));
        assert!(matches!(Error::from_errno(Errno::ENAMETOOLONG, None), Error::NameTooLong { .. }));
        assert!(matches!(Error::from_errno(Errno::EMFILE, None), Error::ResourceExhausted { .. }));
        assert!(matches!(Error::from_errno(Errno::ENOMEM, None), Error::OutOfMemory { .. }));
        assert!(matches!(Error::from_errno(Errno::ENOSPC, None), Error::OutOfSpace { .. }));
        assert!(matches!(Error::from_errno(Errno::ENOSYS, None), Error::Unsupported));
    }

    #[test]
    fn test_unmapped_errno_keeps_code() {
        let err = Error::from_errno(Errno::ELOOP, None);
        assert!(matches!(err, Error::Os { code, .. } if code == Errno::ELOOP as i32));
        assert_eq!(err.raw_os_error(), Some(Errno::ELOOP as i32));
    }

    #[test]
    fn test_resource_exhausted_keeps_its_errno() {
        for errno in [Errno::EMFILE, Errno::ENFILE] {
            let err = Error::from_errno(errno, None);
            assert!(matches!(err, Error::ResourceExhausted { .. }));
            assert_eq!(err.raw_os_error(), Some(errno as i32));
        }
    }

    #[test]
    fn test_display_includes_path() {
        let err = Error::from_errno(Errno::ENOENT, Some(Path::new("/nope")));
        assert_eq!(err.to_string(), "no such file or directory: /nope");
        assert_eq!(Error::Closed.to_string(), "inotify channel is closed");
    }

    #[test]
    fn test_terminal_event_display() {
        let err = Error::TerminalEvent(Box::new(TerminalEvent {
            watch_id: WatchId::from_raw(3),
            mask: EventMask::UNMOUNT,
            path: Some(PathBuf::from("/mnt/usb")),
            name: None,
            events: Vec::new(),
        }));
        assert_eq!(err.to_string(), "terminal event IN_UNMOUNT on watch 3 (/mnt/usb)");
        assert!(err.terminal_event().is_some());
        assert_eq!(err.raw_os_error(), None);
    }
}
