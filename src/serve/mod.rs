//! Content server with live reload support.
//!
//! The server is bound once to a fixed address. It never falls back to
//! another port: the host process is handed the configured URL, so serving
//! anywhere else would leave it pointing at nothing.
//!
//! With `serve.command` set, the renderer's own dev server is run instead
//! (see [`CommandServer`]); otherwise [`StaticServer`] serves `serve.root`.
//!
//! ```text
//! start() ──▶ bind ──▶ [live reload] ──▶ accept thread ──▶ rayon pool ──▶ handle_request
//!                                                           │
//! close() ──▶ closing = true ──▶ unblock ──▶ join ──▶ stop reload
//! ```

mod command;
mod path;
mod reload;
mod response;


use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use anyhow::anyhow;
use thiserror::Error;
use tiny_http::{Request, Server};

use crate::{config::DevConfig, debug, log};
pub use command::CommandServer;
use reload::LiveReload;

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Errors starting the content server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("port {} is unavailable on {}", .addr.port(), .addr.ip())]
    PortUnavailable {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to create request thread pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn server thread")]
    Thread(#[source] std::io::Error),

    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Something that can serve the UI layer.
pub trait ContentServer {
    fn start(&self) -> Result<Box<dyn ServerHandle>, ServeError>;
}

/// A running content server.
pub trait ServerHandle {
    /// URLs the server answers on, for the developer.
    fn urls(&self) -> &[String];

    /// Stop serving and release the port. Consumes the handle.
    fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// Content server for `config`: the external command when one is set,
/// the built-in static server otherwise.
pub fn from_config(config: &DevConfig) -> Box<dyn ContentServer> {
    if config.serve.uses_command() {
        Box::new(CommandServer::new(config))
    } else {
        Box::new(StaticServer::new(config))
    }
}

// ============================================================================
// StaticServer
// ============================================================================

/// Static file server over the renderer root.
#[derive(Debug, Clone)]
pub struct StaticServer {
    interface: IpAddr,
    port: u16,
    root: PathBuf,
    url: String,
    hotreload: bool,
    ws_port: u16,
}

impl StaticServer {
    pub fn new(config: &DevConfig) -> Self {
        let serve = &config.serve;
        Self {
            interface: serve.interface,
            port: serve.port,
            root: serve.root.clone(),
            url: serve.url(),
            hotreload: serve.hotreload,
            ws_port: serve.ws_port,
        }
    }

    fn start_reload(&self) -> Option<LiveReload> {
        if !self.hotreload {
            return None;
        }
        match LiveReload::start(&self.root, self.ws_port) {
            Ok(reload) => {
                debug!("reload"; "ws://127.0.0.1:{}", reload.port());
                Some(reload)
            }
            Err(e) => {
                log!("reload"; "disabled: {:#}", e);
                None
            }
        }
    }
}

impl ContentServer for StaticServer {
    fn start(&self) -> Result<Box<dyn ServerHandle>, ServeError> {
        let addr = SocketAddr::new(self.interface, self.port);
        let server =
            Arc::new(Server::http(addr).map_err(|source| ServeError::PortUnavailable { addr, source })?);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("devloop-http-{i}"))
            .build()?;

        let reload = self.start_reload();
        let closing = Arc::new(AtomicBool::new(false));
        let site = Arc::new(Site {
            root: self.root.clone(),
            reload_port: reload.as_ref().map(LiveReload::port),
            closing: Arc::clone(&closing),
        });

        let thread = {
            let server = Arc::clone(&server);
            thread::Builder::new()
                .name("devloop-serve".into())
                .spawn(move || run_request_loop(&server, &pool, &site))
                .map_err(ServeError::Thread)?
        };

        Ok(Box::new(StaticServerHandle {
            server,
            thread: Some(thread),
            closing,
            reload,
            urls: vec![self.url.clone()],
        }))
    }
}

/// Per-server request state shared with worker threads.
struct Site {
    root: PathBuf,
    reload_port: Option<u16>,
    closing: Arc<AtomicBool>,
}

fn run_request_loop(server: &Server, pool: &rayon::ThreadPool, site: &Arc<Site>) {
    for request in server.incoming_requests() {
        let site = Arc::clone(site);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &site) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, site: &Site) -> anyhow::Result<()> {
    if site.closing.load(Ordering::Relaxed) {
        return response::respond_unavailable(request);
    }

    if let Some(port) = site.reload_port
        && request.url() == reload::SCRIPT_PATH
    {
        return response::respond_reload_js(request, port);
    }

    match path::resolve(request.url(), &site.root) {
        Some(path) => response::respond_file(request, &path, site.reload_port),
        None => response::respond_not_found(request),
    }
}

// ============================================================================
// StaticServerHandle
// ============================================================================

/// Handle to a running [`StaticServer`].
///
/// Dropping it without [`ServerHandle::close`] still stops the server.
pub struct StaticServerHandle {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
    closing: Arc<AtomicBool>,
    reload: Option<LiveReload>,
    urls: Vec<String>,
}

impl StaticServerHandle {
    fn shutdown(&mut self) -> anyhow::Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        self.closing.store(true, Ordering::Relaxed);
        self.server.unblock();
        let joined = thread
            .join()
            .map_err(|_| anyhow!("content server thread panicked"));

        if let Some(reload) = self.reload.take() {
            reload.stop();
        }
        joined
    }
}

impl ServerHandle for StaticServerHandle {
    fn urls(&self) -> &[String] {
        &self.urls
    }

    fn close(mut self: Box<Self>) -> anyhow::Result<()> {
        self.shutdown()?;
        debug!("serve"; "closed");
        Ok(())
    }
}

impl Drop for StaticServerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
