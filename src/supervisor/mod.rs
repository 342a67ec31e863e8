//! Host process supervision.
//!
//! [`Supervisor`] owns at most one host process. It is either Stopped (no
//! child) or Running (one live child), and every transition goes through
//! `restart`, `stop` or `poll_exit` on the orchestrator thread.
//!
//! ```text
//!            restart                     restart
//! Stopped ───────────▶ Running ─────────────────▶ Running (new pid)
//!    ▲                    │ stop / poll_exit         kill old, spawn new
//!    └────────────────────┘
//! ```
//!
//! Spawning is behind [`Launcher`] so tests can count spawns and kills
//! without starting real processes.

mod env;
mod process;

#[cfg(test)]
pub(crate) mod tests;

pub use env::HostCommand;
pub use process::ProcessLauncher;

use std::{io, process::ExitStatus};

use anyhow::{Context, Result};

use crate::{debug, log};

/// Starts host processes.
pub trait Launcher {
    type Child: HostChild;

    fn spawn(&self, cmd: &HostCommand) -> io::Result<Self::Child>;
}

/// Handle to one spawned host process.
pub trait HostChild {
    fn id(&self) -> u32;

    /// Ask the process to quit, force it if needed, and wait for it.
    fn kill(&mut self) -> io::Result<()>;

    /// Non-blocking exit check.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
}

/// Single owner of the current host process.
pub struct Supervisor<'a, L: Launcher> {
    launcher: &'a L,
    command: HostCommand,
    child: Option<L::Child>,
}

impl<'a, L: Launcher> Supervisor<'a, L> {
    pub fn new(launcher: &'a L, command: HostCommand) -> Self {
        Self {
            launcher,
            command,
            child: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Kill the current child (if any), then spawn a new one.
    ///
    /// The old handle is cleared before spawning, so a failed spawn leaves
    /// the supervisor Stopped rather than pointing at a dead process.
    pub fn restart(&mut self) -> Result<u32> {
        self.stop();

        let name = self.command.display_name();
        let child = self
            .launcher
            .spawn(&self.command)
            .with_context(|| format!("failed to spawn `{name}`"))?;

        let pid = child.id();
        debug!("host"; "spawned `{}` (pid {})", name, pid);
        self.child = Some(child);
        Ok(pid)
    }

    /// Kill the current child. Does nothing when Stopped.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let pid = child.id();
        match child.kill() {
            Ok(()) => debug!("host"; "stopped pid {}", pid),
            Err(e) => log!("error"; "failed to stop host process {}: {}", pid, e),
        }
    }

    /// Reap a child that exited on its own.
    ///
    /// Returns its status once; afterwards the supervisor is Stopped until
    /// the next restart.
    pub fn poll_exit(&mut self) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                log!("host"; "process {} exited ({}), waiting for changes", child.id(), status);
                self.child = None;
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("host"; "exit check failed: {}", e);
                None
            }
        }
    }
}

impl<L: Launcher> Drop for Supervisor<'_, L> {
    fn drop(&mut self) {
        self.stop();
    }
}
