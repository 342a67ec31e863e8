//! Live reload for pages served from the renderer root.
//!
//! A WebSocket listener accepts page clients, a `notify` watcher on the
//! renderer root broadcasts `reload` to all of them on every change. The
//! injected script reloads the page when the message arrives.

use std::{
    net::{TcpListener, TcpStream},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tungstenite::{Message, WebSocket};

use crate::watch::ChangeEvent;

/// URL the injected script tag loads.
pub const SCRIPT_PATH: &str = "/__devloop/reload.js";

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Acceptor poll interval while no client is connecting.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Upper bound on a single client handshake, so an idle socket cannot stall
/// the acceptor (and with it `stop`).
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

const SCRIPT_TEMPLATE: &str = include_str!("reload.js");

/// Render the reload client for `ws_port`.
pub fn script(ws_port: u16) -> String {
    SCRIPT_TEMPLATE.replace("__DEVLOOP_WS_PORT__", &ws_port.to_string())
}

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Running live reload endpoint.
pub struct LiveReload {
    port: u16,
    clients: Clients,
    stop: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl LiveReload {
    /// Bind the WebSocket port (retrying upward from `base_port`) and watch
    /// `root` for changes. A missing root only disables the watcher.
    pub fn start(root: &Path, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
        if base_port != 0 && port != base_port {
            crate::log!("reload"; "port {} in use, using {} instead", base_port, port);
        }
        listener.set_nonblocking(true)?;

        let clients: Clients = Arc::default();
        let stop = Arc::new(AtomicBool::new(false));

        let acceptor = {
            let clients = Arc::clone(&clients);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("devloop-reload".into())
                .spawn(move || accept_loop(&listener, &clients, &stop))
                .context("failed to spawn reload acceptor")?
        };

        let watcher = if root.is_dir() {
            Some(watch_root(root, Arc::clone(&clients))?)
        } else {
            None
        };

        Ok(Self {
            port,
            clients,
            stop,
            acceptor: Some(acceptor),
            _watcher: watcher,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Stop accepting and close every client.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        for mut ws in self.clients.lock().drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}

fn accept_loop(listener: &TcpListener, clients: &Clients, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("reload"; "client connected: {}", addr);
                if let Err(e) = prepare_stream(&stream) {
                    crate::debug!("reload"; "dropping {}: {}", addr, e);
                    continue;
                }
                match tungstenite::accept(stream) {
                    Ok(ws) => clients.lock().push(ws),
                    Err(e) => crate::debug!("reload"; "handshake failed: {}", e),
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Blocking mode with bounded reads and writes for the handshake and later
/// broadcasts.
fn prepare_stream(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    stream.set_write_timeout(Some(HANDSHAKE_TIMEOUT))
}

fn watch_root(root: &Path, clients: Clients) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res
            && let Some(change) = ChangeEvent::from_notify(&event)
        {
            let sent = broadcast(&clients, "reload");
            crate::debug!("reload"; "{} → {} page(s)", change.describe(), sent);
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Send `message` to every client, dropping the ones that are gone.
fn broadcast(clients: &Clients, message: &str) -> usize {
    let mut clients = clients.lock();
    clients.retain_mut(|ws| ws.send(Message::Text(message.to_owned().into())).is_ok());
    clients.len()
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
