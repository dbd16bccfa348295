use super::{Readiness, CHANNEL_TOKEN, STOP_TOKEN};
use crate::channel::InitFlags;
use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags};
use std::ffi::CStr;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

pub(crate) fn init(flags: InitFlags) -> nix::Result<OwnedFd> {
    let mut raw = 0;
    if flags.contains(InitFlags::CLOEXEC) {
        raw |= libc::IN_CLOEXEC;
    }
    if flags.contains(InitFlags::NONBLOCK) {
        raw |= libc::IN_NONBLOCK;
    }

    let fd = Errno::result(unsafe { libc::inotify_init1(raw) })?;
    // SAFETY: inotify_init1 just returned this descriptor and nothing else owns it
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

pub(crate) fn add_watch(fd: BorrowedFd<'_>, path: &CStr, mask: u32) -> nix::Result<i32> {
    Errno::result(unsafe { libc::inotify_add_watch(fd.as_raw_fd(), path.as_ptr(), mask) })
}

pub(crate) fn rm_watch(fd: BorrowedFd<'_>, wd: i32) -> nix::Result<()> {
    Errno::result(unsafe { libc::inotify_rm_watch(fd.as_raw_fd(), wd) }).map(drop)
}

/// Open and immediately close a throwaway instance
///
/// Only `ENOSYS` means the facility is missing; running out of
/// descriptors at probe time still proves it exists.
pub(crate) fn probe() -> bool {
    match init(InitFlags::CLOEXEC) {
        Ok(_) => true,
        Err(Errno::ENOSYS) => false,
        Err(_) => true,
    }
}

/// epoll set holding the channel handle and an optional stop handle
pub(crate) struct Poller {
    epoll: Epoll,
}

impl Poller {
    pub fn new() -> nix::Result<Self> {
        Ok(Self {
            epoll: Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)?,
        })
    }

    pub fn add(&self, fd: BorrowedFd<'_>, token: u64) -> nix::Result<()> {
        self.epoll.add(fd, EpollEvent::new(EpollFlags::EPOLLIN, token))
    }

    /// `timeout_ms` of -1 waits forever
    pub fn wait(&self, timeout_ms: isize) -> nix::Result<Readiness> {
        let mut events = [EpollEvent::empty(); 2];
        let ready = self.epoll.wait(&mut events, timeout_ms)?;

        let mut readiness = Readiness::default();
        for event in &events[..ready] {
            match event.data() {
                CHANNEL_TOKEN => readiness.channel = true,
                STOP_TOKEN => readiness.stop = true,
                _ => {}
            }
        }
        Ok(readiness)
    }
}
