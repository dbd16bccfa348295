//! Platform-specific inotify and epoll calls
//!
//! Linux gets the real syscalls. Everywhere else every call reports
//! `ENOSYS`, which surfaces as [`Error::Unsupported`](crate::Error::Unsupported)
//! and makes [`has_inotify`](crate::has_inotify) false.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
pub(crate) use linux::{add_watch, init, probe, rm_watch, Poller};

#[cfg(not(target_os = "linux"))]
pub(crate) use unsupported::{add_watch, init, probe, rm_watch, Poller};

/// Token the channel handle is registered under in the poller
pub(crate) const CHANNEL_TOKEN: u64 = 0;

/// Token the stop signal is registered under in the poller
pub(crate) const STOP_TOKEN: u64 = 1;

/// Which registered handles a poller wait found readable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Readiness {
    pub channel: bool,
    pub stop: bool,
}
