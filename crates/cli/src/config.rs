//! Settings from the command line and an optional TOML file

use anyhow::{bail, Context, Result};
use inwatch::{parse_mask, EventMask, DEFAULT_TERMINAL_EVENTS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// Contents of a `--config` file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub paths: Vec<PathBuf>,
    pub mask: Option<String>,
    pub terminal: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_events: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub paths: Vec<PathBuf>,
    pub mask: EventMask,
    pub terminal: EventMask,
    pub timeout: Option<Duration>,
    pub max_events: Option<u64>,
}

impl Settings {
    /// Merge command-line values over the config file, if one was given
    pub fn resolve(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    fn merge(cli: Cli, file: FileConfig) -> Result<Self> {
        let paths = if cli.paths.is_empty() { file.paths } else { cli.paths };
        if paths.is_empty() {
            bail!("no paths to watch");
        }

        let mask = match cli.mask.or(file.mask) {
            Some(text) => parse_mask(&text).context("invalid --mask")?,
            None => EventMask::ALL_EVENTS,
        };
        let terminal = match cli.terminal.or(file.terminal) {
            Some(text) => parse_mask(&text).context("invalid --terminal")?,
            None => DEFAULT_TERMINAL_EVENTS,
        };

        Ok(Self {
            paths,
            mask,
            terminal,
            timeout: cli.timeout_ms.or(file.timeout_ms).map(Duration::from_millis),
            max_events: cli.max_events.or(file.max_events),
        })
    }
}
