//! Dev loop sequencing.
//!
//! ```text
//! empty output ─▶ start server ─┬─ fail ─▶ Exit::ServerUnavailable
//!                               └─ ok ──▶ ensure output ─▶ build bridge ─▶ build host
//!                                         ─▶ shutdown pending? ─yes─▶ close server, Exit::Shutdown
//!                                         ─▶ watch output ─▶ spawn host ─▶ event loop
//!
//! event loop:  shutdown ─▶ stop host, close server, Exit::Shutdown
//!              change   ─▶ restart host
//!              idle     ─▶ reap a host that exited on its own
//! ```
//!
//! Everything runs on the calling thread. Watch events and the shutdown
//! request arrive over channels, so restarts happen one at a time in the
//! order the events were delivered.


use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, TryRecvError};

use crate::{
    bundle::{self, Bundler},
    config::DevConfig,
    debug, log, logger,
    outdir::{self, Cleanup},
    serve::{ContentServer, ServerHandle},
    supervisor::{HostCommand, Launcher, Supervisor},
    watch::{ChangeEvent, OutputWatcher},
};

/// How often the event loop checks whether the host exited by itself.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Termination signal, everything torn down.
    Shutdown,
    /// The content server could not start; nothing was built or spawned.
    ServerUnavailable,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Self::Shutdown => 0,
            Self::ServerUnavailable => 1,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// One dev loop run over borrowed collaborators.
pub struct Orchestrator<'a, S, B, L>
where
    S: ContentServer + ?Sized,
    B: Bundler + ?Sized,
    L: Launcher,
{
    pub config: &'a DevConfig,
    pub server: &'a S,
    pub bundler: &'a B,
    pub launcher: &'a L,
}

impl<S, B, L> Orchestrator<'_, S, B, L>
where
    S: ContentServer + ?Sized,
    B: Bundler + ?Sized,
    L: Launcher,
{
    /// Run until `shutdown` yields (or disconnects).
    ///
    /// Build and initial spawn failures are returned as errors; the server
    /// is closed on those paths too.
    pub fn run(self, shutdown: &Receiver<()>) -> Result<Exit> {
        let config = self.config;
        let out_dir = config.output_dir();

        if let Cleanup::Failed(e) = outdir::empty(out_dir) {
            debug!("clean"; "continuing with leftovers ({:?})", e.kind());
        }

        let mut server = match self.server.start() {
            Ok(handle) => ServerGuard::new(handle),
            Err(e) => {
                log!("error"; "content server failed to start: {:#}", anyhow::Error::from(e));
                return Ok(Exit::ServerUnavailable);
            }
        };
        for url in server.urls() {
            log!("serve"; "{}", url);
        }

        outdir::ensure_exists(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        bundle::build_all(self.bundler, config)?;

        if shutdown_pending(shutdown) {
            log!("host"; "shutdown requested during build, not starting the host");
            server.close()?;
            return Ok(Exit::Shutdown);
        }

        let (tx, changes) = channel::unbounded();
        let _watcher = OutputWatcher::spawn(out_dir, tx)
            .with_context(|| format!("failed to watch {}", out_dir.display()))?;

        // Declared after the guard: on error paths the host dies first
        let command = HostCommand::from_config(config, std::env::vars_os());
        let name = command.display_name();
        let mut supervisor = Supervisor::new(self.launcher, command);
        let pid = supervisor.restart()?;
        log!("host"; "started `{}` (pid {})", name, pid);

        event_loop(&mut supervisor, shutdown, &changes);

        supervisor.stop();
        server.close()?;
        Ok(Exit::Shutdown)
    }
}

/// A signal (or a dropped sender) that arrived before the event loop.
fn shutdown_pending(shutdown: &Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

/// Restart on every change until shutdown.
///
/// Also returns when the change channel disconnects, which only happens
/// once the watcher is gone.
fn event_loop<L: Launcher>(
    supervisor: &mut Supervisor<'_, L>,
    shutdown: &Receiver<()>,
    changes: &Receiver<ChangeEvent>,
) {
    loop {
        crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(changes) -> event => match event {
                Ok(event) => on_change(supervisor, &event),
                Err(_) => break,
            },
            default(EXIT_POLL_INTERVAL) => {
                if supervisor.is_running() {
                    supervisor.poll_exit();
                }
            }
        }
    }
}

fn on_change<L: Launcher>(supervisor: &mut Supervisor<'_, L>, event: &ChangeEvent) {
    debug!("watch"; "{}", event.describe());
    match supervisor.restart() {
        Ok(pid) => logger::status_success(&format!("host restarted (pid {pid})")),
        // Stays Stopped until the next change
        Err(e) => logger::status_error("host restart failed", &format!("{e:#}")),
    }
}

/// Closes the server on every exit path.
struct ServerGuard {
    handle: Option<Box<dyn ServerHandle>>,
}

impl ServerGuard {
    fn new(handle: Box<dyn ServerHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    fn urls(&self) -> &[String] {
        match &self.handle {
            Some(handle) => handle.urls(),
            None => &[],
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.close(),
            None => Ok(()),
        }
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log!("error"; "failed to close content server: {:#}", e);
        }
    }
}
