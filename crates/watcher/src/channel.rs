//! Owner of one inotify instance
//!
//! A [`Channel`] wraps the kernel handle, keeps the [`WatchRegistry`] in
//! step with the add/remove syscalls and turns raw reads into [`Event`]s.

use crate::decoder::{decode_record, HEADER_SIZE, NAME_MAX};
use crate::error::{Error, Result, TerminalEvent};
use crate::event::{Event, WatchId};
use crate::mask::EventMask;
use crate::platform;
use crate::registry::WatchRegistry;
use bitflags::bitflags;
use nix::errno::Errno;
use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Size of the read buffer; holds at least one record with a maximal name
pub const BUFFER_SIZE: usize = 64 * 1024;

const _: () = assert!(BUFFER_SIZE >= HEADER_SIZE + NAME_MAX + 1);

bitflags! {
    /// Options for [`Channel::open`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InitFlags: u8 {
        /// Close the handle across `exec`
        const CLOEXEC = 0b01;
        /// Reads return immediately when no event is queued
        const NONBLOCK = 0b10;
    }
}

impl Default for InitFlags {
    fn default() -> Self {
        InitFlags::CLOEXEC
    }
}

/// Whether this host provides inotify at all
///
/// Probed once per process and cached.
pub fn has_inotify() -> bool {
    static HAS_INOTIFY: OnceLock<bool> = OnceLock::new();
    *HAS_INOTIFY.get_or_init(platform::probe)
}

/// Outcome of one raw read of the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawRead {
    /// This many bytes were read; 0 when the read returned nothing
    Data(usize),
    /// Non-blocking handle had nothing queued
    WouldBlock,
}

/// One inotify instance and the watches registered on it
pub struct Channel {
    fd: Option<OwnedFd>,
    registry: WatchRegistry,
    buf: Box<[u8]>,
    /// Start of the undecoded bytes in `buf`
    pos: usize,
    /// End of the bytes filled by the last read
    len: usize,
}

impl Channel {
    /// Open a close-on-exec, blocking channel
    pub fn new() -> Result<Self> {
        Self::open(InitFlags::default())
    }

    /// Open a channel with the given flags
    ///
    /// Fails with [`Error::Unsupported`] without touching the kernel when
    /// [`has_inotify`] is false.
    pub fn open(flags: InitFlags) -> Result<Self> {
        if !has_inotify() {
            return Err(Error::Unsupported);
        }

        let fd = platform::init(flags).map_err(|errno| Error::from_errno(errno, None))?;
        debug!(fd = fd.as_raw_fd(), ?flags, "opened inotify channel");

        Ok(Self {
            fd: Some(fd),
            registry: WatchRegistry::new(),
            buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
        })
    }

    /// Borrow the kernel handle, for multiplexing with other descriptors
    pub fn fd(&self) -> Result<BorrowedFd<'_>> {
        self.fd.as_ref().map(AsFd::as_fd).ok_or(Error::Closed)
    }

    /// True once [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    /// Release the handle and forget every watch
    ///
    /// Calling it again is a no-op. Every other operation fails with
    /// [`Error::Closed`] afterwards.
    pub fn close(&mut self) -> Result<()> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };

        self.registry.clear();
        self.pos = 0;
        self.len = 0;

        let raw = fd.into_raw_fd();
        debug!(fd = raw, "closing inotify channel");
        nix::unistd::close(raw).map_err(|errno| Error::from_errno(errno, None))
    }

    /// Watch `path` for the events in `mask`
    ///
    /// Re-adding a watched path updates the existing kernel watch; the
    /// registry keeps a single entry for it either way.
    pub fn add_watch(&mut self, path: impl AsRef<Path>, mask: EventMask) -> Result<WatchId> {
        let path = path.as_ref();
        let fd = self.fd()?;

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::InvalidArgument {
            path: Some(path.to_path_buf()),
        })?;
        let wd = platform::add_watch(fd, &c_path, mask.bits())
            .map_err(|errno| Error::from_errno(errno, Some(path)))?;

        let id = WatchId::from_raw(wd);
        trace!(%id, path = %path.display(), mask = mask.bits(), "added watch");
        self.registry.register(path, id);
        Ok(id)
    }

    /// Stop watching `path`; succeeds if it was not watched
    pub fn remove_watch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.fd()?;

        match self.registry.id_for(path) {
            Some(id) => self.remove_registered(id, path.to_path_buf()),
            None => {
                debug!(path = %path.display(), "path is not watched");
                Ok(())
            }
        }
    }

    /// Stop watching `id`; succeeds if it is not a live watch
    pub fn remove_watch_by_id(&mut self, id: WatchId) -> Result<()> {
        self.fd()?;

        match self.registry.path_for(id).map(Path::to_path_buf) {
            Some(path) => self.remove_registered(id, path),
            None => {
                debug!(%id, "watch id is not registered");
                Ok(())
            }
        }
    }

    /// Issue the rm_watch syscall and prune the registry whatever it returns
    fn remove_registered(&mut self, id: WatchId, path: PathBuf) -> Result<()> {
        let result = platform::rm_watch(self.fd()?, id.as_raw());
        self.registry.unregister_by_id(id);
        trace!(%id, path = %path.display(), "removed watch");
        result.map_err(|errno| Error::from_errno(errno, Some(&path)))
    }

    /// Path watched under `id`, if it is live
    pub fn watch_path(&self, id: WatchId) -> Option<&Path> {
        self.registry.path_for(id)
    }

    /// Id of the live watch on `path`
    pub fn watch_id(&self, path: impl AsRef<Path>) -> Option<WatchId> {
        self.registry.id_for(path.as_ref())
    }

    /// Every path currently watched, in no particular order
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.registry.all_paths()
    }

    /// Every live `(id, path)` pair
    pub fn watches(&self) -> impl Iterator<Item = (WatchId, &Path)> + '_ {
        self.registry.iter()
    }

    /// Read-only view of the watch bookkeeping
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Read whatever the kernel has queued into `buf`
    ///
    /// On a blocking channel this waits for at least one record.
    pub fn read_raw(&self, buf: &mut [u8]) -> Result<RawRead> {
        read_fd(self.fd()?.as_raw_fd(), buf)
    }

    /// Next event, reading from the kernel only when nothing is buffered
    ///
    /// Returns `Ok(None)` when a non-blocking channel has nothing queued.
    /// The watch path is attached before an `IGNORED` record prunes its
    /// registry entry.
    pub fn read_event(&mut self) -> Result<Option<Event>> {
        if self.pos >= self.len {
            self.fill()?;
            if self.pos >= self.len {
                return Ok(None);
            }
        }

        let mut event = match decode_record(&self.buf[self.pos..self.len]) {
            Ok((event, consumed)) => {
                self.pos += consumed;
                event
            }
            Err(Error::Truncated {
                offset,
                needed,
                available,
            }) => {
                let at = self.pos + offset;
                self.pos = self.len;
                return Err(Error::Truncated {
                    offset: at,
                    needed,
                    available,
                });
            }
            Err(err) => return Err(err),
        };

        event.watch_path = self.registry.path_for(event.watch_id).map(Path::to_path_buf);

        if event.mask.contains(EventMask::IGNORED)
            && self.registry.unregister_by_id(event.watch_id).is_some()
        {
            debug!(id = %event.watch_id, "watch removed by kernel");
        }

        Ok(Some(event))
    }

    /// Every event available right now
    ///
    /// Stops at the first record intersecting `terminal` and fails with
    /// [`Error::TerminalEvent`] carrying that record and the ones read before
    /// it; later records stay buffered. Only meaningful on a non-blocking
    /// channel: a blocking one would wait here forever once drained.
    pub fn read_events(&mut self, terminal: EventMask) -> Result<Vec<Event>> {
        let mut events = Vec::new();

        while let Some(event) = self.read_event()? {
            if event.mask.intersects(terminal) {
                return Err(Error::TerminalEvent(Box::new(TerminalEvent {
                    watch_id: event.watch_id,
                    mask: event.mask,
                    path: event.watch_path,
                    name: event.name,
                    events,
                })));
            }
            events.push(event);
        }

        Ok(events)
    }

    /// Lazy iterator over [`read_event`](Self::read_event)
    ///
    /// Blocks between items on a blocking channel; on a non-blocking one it
    /// ends once nothing is queued. It also ends after yielding an error.
    pub fn events(&mut self) -> Events<'_> {
        Events {
            channel: self,
            done: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let raw = self.fd()?.as_raw_fd();
        let n = match read_fd(raw, &mut self.buf)? {
            RawRead::Data(n) => n,
            RawRead::WouldBlock => 0,
        };
        trace!(bytes = n, "read inotify buffer");
        self.pos = 0;
        self.len = n;
        Ok(())
    }
}

fn read_fd(fd: RawFd, buf: &mut [u8]) -> Result<RawRead> {
    loop {
        match nix::unistd::read(fd, buf) {
            Ok(n) => return Ok(RawRead::Data(n)),
            Err(Errno::EAGAIN) => return Ok(RawRead::WouldBlock),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::from_errno(errno, None)),
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("fd", &self.fd.as_ref().map(AsRawFd::as_raw_fd))
            .field("watches", &self.registry.len())
            .field("buffered", &(self.len - self.pos))
            .finish()
    }
}

/// Iterator returned by [`Channel::events`]
pub struct Events<'a> {
    channel: &'a mut Channel,
    done: bool,
}

impl Iterator for Events<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.channel.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<'a> IntoIterator for &'a mut Channel {
    type Item = Result<Event>;
    type IntoIter = Events<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.events()
    }
}
