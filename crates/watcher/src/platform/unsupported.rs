use super::Readiness;
use crate::channel::InitFlags;
use nix::errno::Errno;
use std::ffi::CStr;
use std::os::fd::{BorrowedFd, OwnedFd};

pub(crate) fn init(_flags: InitFlags) -> nix::Result<OwnedFd> {
    Err(Errno::ENOSYS)
}

pub(crate) fn add_watch(_fd: BorrowedFd<'_>, _path: &CStr, _mask: u32) -> nix::Result<i32> {
    Err(Errno::ENOSYS)
}

pub(crate) fn rm_watch(_fd: BorrowedFd<'_>, _wd: i32) -> nix::Result<()> {
    Err(Errno::ENOSYS)
}

pub(crate) fn probe() -> bool {
    false
}

pub(crate) struct Poller;

impl Poller {
    pub fn new() -> nix::Result<Self> {
        Err(Errno::ENOSYS)
    }

    pub fn add(&self, _fd: BorrowedFd<'_>, _token: u64) -> nix::Result<()> {
        Err(Errno::ENOSYS)
    }

    pub fn wait(&self, _timeout_ms: isize) -> nix::Result<Readiness> {
        Err(Errno::ENOSYS)
    }
}
