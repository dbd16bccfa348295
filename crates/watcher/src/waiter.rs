//! Interruptible wait on a channel
//!
//! [`PollChannel`] pairs a non-blocking [`Channel`] with an optional stop
//! handle. Both sit in one epoll set, so a single blocking call returns when
//! either is readable. The stop handle is only borrowed; draining or closing
//! it is up to its owner.

use crate::channel::{Channel, InitFlags};
use crate::error::{Error, Result};
use crate::platform::{Poller, CHANNEL_TOKEN, STOP_TOKEN};
use nix::errno::Errno;
use std::ops::{Deref, DerefMut};
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};
use tracing::trace;

/// A non-blocking channel with a `wait` that a stop handle can interrupt
pub struct PollChannel<'s> {
    channel: Channel,
    stop: Option<BorrowedFd<'s>>,
    /// Created by the first `wait` and reused by later ones
    poller: Option<Poller>,
}

impl<'s> PollChannel<'s> {
    /// Open a non-blocking, close-on-exec channel
    ///
    /// `stop`, when given, is watched for readability alongside the channel
    /// in every [`wait`](Self::wait).
    pub fn new(stop: Option<BorrowedFd<'s>>) -> Result<Self> {
        Ok(Self {
            channel: Channel::open(InitFlags::CLOEXEC | InitFlags::NONBLOCK)?,
            stop,
            poller: None,
        })
    }

    /// The borrowed stop handle, if any
    pub fn stop_signal(&self) -> Option<BorrowedFd<'s>> {
        self.stop
    }

    /// The wrapped channel
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    /// Block until the channel or the stop handle is readable
    ///
    /// Returns `true` when events can be read and `false` when the stop
    /// handle fired; the stop handle wins if both are ready. With a
    /// `timeout`, fails with [`Error::TimedOut`] once it elapses with
    /// neither ready. `None` waits indefinitely.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let poller = self.poller()?;
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        loop {
            let timeout_ms = match deadline {
                Some(deadline) => epoll_timeout(deadline.saturating_duration_since(Instant::now())),
                None => -1,
            };

            let readiness = match poller.wait(timeout_ms) {
                Ok(readiness) => readiness,
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(Error::from_errno(errno, None)),
            };
            trace!(?readiness, timeout_ms, "poll returned");

            if readiness.stop {
                return Ok(false);
            }
            if readiness.channel {
                return Ok(true);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Error::TimedOut);
            }
        }
    }

    /// Close the channel and release the epoll set; idempotent
    pub fn close(&mut self) -> Result<()> {
        self.poller = None;
        self.channel.close()
    }

    fn poller(&mut self) -> Result<&Poller> {
        let channel_fd = self.channel.fd()?;

        if self.poller.is_none() {
            let poller = Poller::new().map_err(|errno| Error::from_errno(errno, None))?;
            poller
                .add(channel_fd, CHANNEL_TOKEN)
                .map_err(|errno| Error::from_errno(errno, None))?;
            if let Some(stop) = self.stop {
                poller
                    .add(stop, STOP_TOKEN)
                    .map_err(|errno| Error::from_errno(errno, None))?;
            }
            self.poller = Some(poller);
        }

        self.poller.as_ref().ok_or(Error::Closed)
    }
}

/// Milliseconds for one epoll wait, rounded up
///
/// Capped at `i32::MAX` since epoll takes a C `int`; longer waits loop.
fn epoll_timeout(left: Duration) -> isize {
    let ms = left.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128);
    ms as isize
}

impl Deref for PollChannel<'_> {
    type Target = Channel;

    fn deref(&self) -> &Channel {
        &self.channel
    }
}

impl DerefMut for PollChannel<'_> {
    fn deref_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }
}

impl std::fmt::Debug for PollChannel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollChannel")
            .field("channel", &self.channel)
            .field("stop", &self.stop)
            .field("polling", &self.poller.is_some())
            .finish()
    }
}
