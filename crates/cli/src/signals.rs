//! SIGINT/SIGTERM delivered through a signalfd
//!
//! The signals are blocked for the calling thread and routed to a
//! descriptor, which the waiter treats as its stop handle. Install before
//! spawning any threads so they inherit the mask.

use anyhow::{Context, Result};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use std::os::fd::{AsFd, BorrowedFd};

pub struct StopSignals {
    fd: SignalFd,
}

impl StopSignals {
    pub fn install() -> Result<Self> {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);
        mask.thread_block().context("failed to block SIGINT/SIGTERM")?;

        let fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .context("failed to create signalfd")?;
        Ok(Self { fd })
    }

    /// Descriptor that becomes readable once a signal is pending
    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Consume one pending signal, if any
    pub fn take(&mut self) -> Result<Option<Signal>> {
        let info = self.fd.read_signal().context("failed to read signalfd")?;
        Ok(info.and_then(|info| Signal::try_from(info.ssi_signo as i32).ok()))
    }
}
