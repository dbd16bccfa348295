//! Helpers for running the `inwatch` binary in tests

#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Command builder around the compiled binary
pub struct InwatchCommand {
    args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl InwatchCommand {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn path(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.display().to_string());
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Start the binary with piped output
    pub fn spawn(&self) -> Result<Running> {
        let child = Command::new(env!("CARGO_BIN_EXE_inwatch"))
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn inwatch")?;

        Ok(Running {
            child,
            started: Instant::now(),
            timeout: self.timeout,
        })
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        self.spawn()?.finish()
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            bail!(
                "inwatch failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            bail!(
                "inwatch should have failed:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

/// A spawned binary
pub struct Running {
    child: Child,
    started: Instant,
    timeout: Duration,
}

impl Running {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn has_exited(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    /// Wait for exit, killing the process once the timeout passes
    pub fn finish(mut self) -> Result<CommandResult> {
        while self.child.try_wait()?.is_none() {
            if self.started.elapsed() > self.timeout {
                self.child.kill()?;
                let output = self.child.wait_with_output()?;
                bail!(
                    "inwatch timed out after {:?}\nStdout: {}\nStderr: {}",
                    self.timeout,
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            thread::sleep(Duration::from_millis(20));
        }

        let output = self.child.wait_with_output()?;
        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: self.started.elapsed(),
        })
    }
}

/// Output of a finished run
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}
