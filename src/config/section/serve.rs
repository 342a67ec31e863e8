//! `[serve]` section configuration.
//!
//! Contains content server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5173                 # HTTP port number, never substituted
//! root = "packages/renderer"  # Directory served as the UI layer
//! hotreload = true            # Reload open pages when files under root change
//! ws_port = 35729             # Live reload WebSocket port
//!
//! # Delegate to the renderer's own dev server instead of serving `root`.
//! # `{host}`, `{port}` and `{root}` are substituted in every argument.
//! command = ["vite", "packages/renderer", "--host", "{host}", "--port", "{port}", "--strictPort"]
//! ```
//!
//! The port is strict: if it is taken, startup fails instead of moving to
//! another port, because the host process is handed this exact URL.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::build::validate_command;
use crate::config::ConfigDiagnostics;

/// Content server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Directory served by the content server.
    pub root: PathBuf,

    /// Enable live reload of open pages.
    pub hotreload: bool,

    /// First port tried for the live reload WebSocket.
    pub ws_port: u16,

    /// External dev server command. Empty serves `root` directly.
    pub command: Vec<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5173,
            root: PathBuf::from("packages/renderer"),
            hotreload: true,
            ws_port: 35729,
            command: Vec::new(),
        }
    }
}

impl ServeConfig {
    /// Address clients connect to.
    ///
    /// Wildcard interfaces are reached over the loopback address of the same
    /// family. `localhost` is avoided since it may resolve to the other family.
    pub fn connect_ip(&self) -> IpAddr {
        match self.interface {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        }
    }

    /// Host part of URLs handed to the host process and the developer.
    pub fn url_host(&self) -> String {
        match self.connect_ip() {
            IpAddr::V6(ip) => format!("[{ip}]"),
            IpAddr::V4(ip) => ip.to_string(),
        }
    }

    /// Fixed URL of the content server.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.url_host(), self.port)
    }

    /// Whether an external dev server replaces the built-in one.
    pub fn uses_command(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error_with_hint(
                "serve.port",
                "port must be fixed, 0 would pick a random port",
                "set a concrete port such as 5173",
            );
        }

        if self.hotreload && self.ws_port == self.port {
            diag.error("serve.ws_port", "must differ from serve.port");
        }

        if self.uses_command() {
            validate_command("serve.command", &self.command, root, diag);
            if !self.command.iter().any(|arg| arg.contains("{port}")) {
                diag.hint(
                    "serve.command",
                    "no `{port}` argument, the server must listen on serve.port by itself",
                );
            }
            return;
        }

        if !self.root.is_dir() {
            diag.hint(
                "serve.root",
                format!("{} does not exist, every request will 404", self.root.display()),
            );
        }
    }
}
