//! Keep-the-display-awake support.
//!
//! The platform inhibitor is a child process held for as long as the lock is
//! held. [`WakeGuard`] makes acquire/release idempotent and swallows failures
//! into the log so a missing inhibitor never affects a session.

use std::fmt;
use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::CapabilityError;

pub trait WakeLock: fmt::Debug {
    fn acquire(&mut self) -> Result<(), CapabilityError>;
    fn release(&mut self) -> Result<(), CapabilityError>;
}

/// Used when keep-awake is disabled.
#[derive(Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Holds `caffeinate` (macOS) or `systemd-inhibit` (Linux) while acquired.
#[derive(Debug, Default)]
pub struct InhibitorWakeLock {
    child: Option<Child>,
}

impl InhibitorWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_os = "macos")]
    fn command() -> Option<Command> {
        let mut cmd = Command::new("caffeinate");
        cmd.arg("-d");
        Some(cmd)
    }

    #[cfg(target_os = "linux")]
    fn command() -> Option<Command> {
        let mut cmd = Command::new("systemd-inhibit");
        cmd.args([
            "--what=idle",
            "--who=cohere",
            "--why=breathing session in progress",
            "sleep",
            "infinity",
        ]);
        Some(cmd)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn command() -> Option<Command> {
        None
    }
}

impl WakeLock for InhibitorWakeLock {
    fn acquire(&mut self) -> Result<(), CapabilityError> {
        if self.child.is_some() {
            return Ok(());
        }
        let mut cmd = Self::command().ok_or(CapabilityError::Unsupported("keep-awake"))?;
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CapabilityError::io("keep-awake", e))?;
        debug!(pid = child.id(), "keep-awake inhibitor spawned");
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) -> Result<(), CapabilityError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        child
            .kill()
            .map_err(|e| CapabilityError::io("keep-awake", e))?;
        let _ = child.wait();
        Ok(())
    }
}

/// Tracks whether the lock is held so it is acquired and released at most
/// once per hold.
#[derive(Debug)]
pub struct WakeGuard {
    lock: Box<dyn WakeLock>,
    held: bool,
}

impl WakeGuard {
    pub fn new(lock: Box<dyn WakeLock>) -> Self {
        Self { lock, held: false }
    }

    pub fn acquire(&mut self) {
        if self.held {
            return;
        }
        match self.lock.acquire() {
            Ok(()) => {
                self.held = true;
                info!("keep-awake acquired");
            }
            Err(e) => warn!("keep-awake unavailable, continuing without it: {e}"),
        }
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        // marked released even on failure; a failed release is not retried
        self.held = false;
        match self.lock.release() {
            Ok(()) => info!("keep-awake released"),
            Err(e) => warn!("failed to release keep-awake: {e}"),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.release();
    }
}
