//! Linux inotify for applications
//!
//! This crate provides:
//! - A [`Channel`] owning one inotify instance, with add/remove watch calls
//!   and non-blocking event reads
//! - A [`WatchRegistry`] keeping watch ids and paths mutually consistent
//! - A [`Decoder`] for the packed kernel record stream
//! - A [`PollChannel`] whose `wait` can be interrupted by an external handle
//!
//! ```no_run
//! use inwatch::{event_names, Channel, EventMask};
//!
//! let mut channel = Channel::new()?;
//! channel.add_watch("/tmp", EventMask::ALL_EVENTS)?;
//!
//! for event in channel.events() {
//!     let event = event?;
//!     if let Some(path) = event.full_path() {
//!         println!("{}: {}", path.display(), event_names(event.mask).join(", "));
//!     }
//! }
//! # Ok::<(), inwatch::Error>(())
//! ```

pub mod channel;
pub mod decoder;
pub mod error;
pub mod event;
pub mod mask;
pub mod registry;
pub mod waiter;

mod platform;

// Re-exports
pub use channel::{has_inotify, Channel, Events, InitFlags, RawRead};
pub use decoder::{decode, Decoder};
pub use error::{Error, Result, TerminalEvent};
pub use event::{Event, WatchId};
pub use mask::{event_names, format_mask, parse_mask, EventMask, ParseMaskError};
pub use registry::WatchRegistry;
pub use waiter::PollChannel;

/// Terminal mask used when a caller has no preference
pub const DEFAULT_TERMINAL_EVENTS: EventMask = EventMask::Q_OVERFLOW.union(EventMask::UNMOUNT);
