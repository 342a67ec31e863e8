//! Content server delegated to an external dev server.
//!
//! The configured command (typically `vite ... --strictPort`) must listen on
//! the fixed port itself. It counts as started once that port accepts a
//! connection, and as unavailable if it exits first.
//!
//! ```text
//! start() ──▶ port free? ──▶ spawn ──▶ poll: exited? ─yes─▶ PortUnavailable
//!                                          │ no
//!                                          ▼
//!                                     connect ok? ─yes─▶ handle
//! close() ──▶ SIGTERM ──▶ (grace) ──▶ SIGKILL ──▶ reap
//! ```

use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    path::PathBuf,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;

use super::{ContentServer, ServeError, ServerHandle};
use crate::{
    config::DevConfig,
    debug, log,
    utils::{
        bin::resolve_program,
        process::{TERM_GRACE, terminate},
    },
};

/// Interval between readiness checks.
const READY_POLL: Duration = Duration::from_millis(100);

/// Connect timeout of a single readiness check.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// How often a slow start is reported.
const WAIT_NOTICE: Duration = Duration::from_secs(10);

/// Runs `serve.command` as the content server.
#[derive(Debug, Clone)]
pub struct CommandServer {
    cwd: PathBuf,
    command: Vec<String>,
    bind: SocketAddr,
    connect: SocketAddr,
    root: PathBuf,
    url: String,
}

impl CommandServer {
    pub fn new(config: &DevConfig) -> Self {
        let serve = &config.serve;
        Self {
            cwd: config.get_root().to_path_buf(),
            command: serve.command.clone(),
            bind: SocketAddr::new(serve.interface, serve.port),
            connect: SocketAddr::new(serve.connect_ip(), serve.port),
            root: serve.root.clone(),
            url: serve.url(),
        }
    }

    fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }

    /// Arguments after the program with `{host}`, `{port}` and `{root}`
    /// substituted.
    fn args(&self) -> Vec<String> {
        let host = self.bind.ip().to_string();
        let port = self.bind.port().to_string();
        let root = self.root.display().to_string();
        self.command
            .iter()
            .skip(1)
            .map(|arg| {
                arg.replace("{host}", &host)
                    .replace("{port}", &port)
                    .replace("{root}", &root)
            })
            .collect()
    }

    fn unavailable(
        &self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> ServeError {
        ServeError::PortUnavailable {
            addr: self.bind,
            source: source.into(),
        }
    }

    fn spawn(&self) -> Result<Child, ServeError> {
        let program = self.program();
        let spawn_error = |source| ServeError::Spawn {
            program: program.to_string(),
            source,
        };

        let resolved = resolve_program(&self.cwd, program).ok_or_else(|| {
            spawn_error(io::Error::new(io::ErrorKind::NotFound, "program not found"))
        })?;

        Command::new(resolved)
            .args(self.args())
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .spawn()
            .map_err(spawn_error)
    }

    /// Block until the port accepts connections or the child exits.
    fn wait_ready(&self, child: &mut Child) -> Result<(), ServeError> {
        let start = Instant::now();
        let mut next_notice = WAIT_NOTICE;

        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.unavailable(e))? {
                return Err(self.unavailable(format!(
                    "`{}` exited with {} before listening",
                    self.program(),
                    status
                )));
            }

            if TcpStream::connect_timeout(&self.connect, CONNECT_TIMEOUT).is_ok() {
                debug!("serve"; "`{}` ready after {} ms", self.program(), start.elapsed().as_millis());
                return Ok(());
            }

            if start.elapsed() >= next_notice {
                log!("serve"; "still waiting for `{}` on {}", self.program(), self.connect);
                next_notice += WAIT_NOTICE;
            }
            thread::sleep(READY_POLL);
        }
    }
}

impl ContentServer for CommandServer {
    fn start(&self) -> Result<Box<dyn ServerHandle>, ServeError> {
        // Strict port: refuse before anything is spawned
        drop(TcpListener::bind(self.bind).map_err(|e| self.unavailable(e))?);

        let mut child = self.spawn()?;
        debug!("serve"; "spawned `{}` (pid {})", self.program(), child.id());

        if let Err(e) = self.wait_ready(&mut child) {
            if let Err(kill) = terminate(&mut child, TERM_GRACE) {
                debug!("serve"; "failed to stop `{}`: {}", self.program(), kill);
            }
            return Err(e);
        }

        Ok(Box::new(CommandServerHandle {
            child: Some(child),
            name: self.program().to_string(),
            urls: vec![self.url.clone()],
        }))
    }
}

/// Handle to a running [`CommandServer`]. Dropping it stops the child too.
pub struct CommandServerHandle {
    child: Option<Child>,
    name: String,
    urls: Vec<String>,
}

impl CommandServerHandle {
    fn shutdown(&mut self) -> io::Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = terminate(&mut child, TERM_GRACE)?;
        debug!("serve"; "`{}` stopped ({})", self.name, status);
        Ok(())
    }
}

impl ServerHandle for CommandServerHandle {
    fn urls(&self) -> &[String] {
        &self.urls
    }

    fn close(mut self: Box<Self>) -> anyhow::Result<()> {
        self.shutdown()
            .with_context(|| format!("failed to stop `{}`", self.name))
    }
}

impl Drop for CommandServerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
