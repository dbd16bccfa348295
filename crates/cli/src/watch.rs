//! The watch loop: wait, read, print

use anyhow::{bail, Context, Result};
use inwatch::{event_names, format_mask, Error, Event, EventMask, PollChannel, TerminalEvent, WatchId};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::signals::StopSignals;

/// Why the loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stopped,
    TimedOut,
    LimitReached,
}

pub fn run(settings: &Settings) -> Result<()> {
    let mut signals = StopSignals::install()?;

    let outcome = {
        let mut poll =
            PollChannel::new(Some(signals.as_fd())).context("failed to open inotify instance")?;

        for path in &settings.paths {
            let id = poll
                .add_watch(path, settings.mask)
                .with_context(|| format!("failed to watch {}", path.display()))?;
            debug!(path = %path.display(), watch_id = %id, "watch added");
        }
        info!(
            paths = settings.paths.len(),
            mask = %format_mask(settings.mask),
            "watching"
        );

        let stdout = io::stdout();
        watch_loop(&mut poll, settings, &mut stdout.lock())?
    };

    match outcome {
        Outcome::Stopped => {
            let signal = signals.take()?;
            info!(?signal, "stopped");
        }
        Outcome::TimedOut => info!("no events before timeout"),
        Outcome::LimitReached => debug!("event limit reached"),
    }
    Ok(())
}

pub fn watch_loop<W: Write>(
    poll: &mut PollChannel<'_>,
    settings: &Settings,
    out: &mut W,
) -> Result<Outcome> {
    let mut printed: u64 = 0;

    loop {
        let remaining = match settings.max_events {
            Some(max) if printed >= max => return Ok(Outcome::LimitReached),
            Some(max) => usize::try_from(max - printed).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        match poll.wait(settings.timeout) {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Stopped),
            Err(Error::TimedOut) => return Ok(Outcome::TimedOut),
            Err(err) => return Err(err).context("wait failed"),
        }

        let events = match poll.read_events(settings.terminal) {
            Ok(events) => events,
            Err(Error::TerminalEvent(terminal)) => {
                for event in terminal.events.iter().take(remaining) {
                    write_event(out, event)?;
                }
                write_terminal(out, &terminal)?;
                out.flush()?;
                error!(watch_id = %terminal.watch_id, mask = %format_mask(terminal.mask), "terminal event");
                bail!("{terminal}");
            }
            Err(err) => return Err(err).context("failed to read events"),
        };

        for event in events.iter().take(remaining) {
            write_event(out, event)?;
            printed += 1;
        }
        out.flush()?;
    }
}

fn write_event<W: Write>(out: &mut W, event: &Event) -> io::Result<()> {
    write_line(out, event.full_path(), event.watch_id, event.mask)
}

fn write_terminal<W: Write>(out: &mut W, terminal: &TerminalEvent) -> io::Result<()> {
    let path = terminal.path.as_ref().map(|path| match &terminal.name {
        Some(name) => path.join(name),
        None => path.clone(),
    });
    write_line(out, path, terminal.watch_id, terminal.mask)
}

fn write_line<W: Write>(
    out: &mut W,
    path: Option<PathBuf>,
    watch_id: WatchId,
    mask: EventMask,
) -> io::Result<()> {
    let names = event_names(mask).join(", ");
    match path {
        Some(path) => writeln!(out, "{}: {}", path.display(), names),
        None => writeln!(out, "<watch {watch_id}>: {names}"),
    }
}
