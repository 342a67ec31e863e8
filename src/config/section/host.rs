//! `[host]` section configuration.
//!
//! Describes how the host process is launched.
//!
//! # Example
//!
//! ```toml
//! [host]
//! command = ["electron"]            # Host runtime (node_modules/.bin is searched first)
//! args = []                         # Extra arguments after the host bundle
//! inspect = 9229                    # Debugger port, 0 disables `--inspect`
//! mode = "development"              # Value of the execution mode variable
//! mode_var = "NODE_ENV"
//! url_var = "ELECTRON_RENDERER_URL" # Receives the content server URL
//!
//! [host.env]
//! ELECTRON_ENABLE_LOGGING = "1"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::build::validate_command;
use crate::config::ConfigDiagnostics;

/// Host process launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host runtime command (program followed by fixed arguments).
    pub command: Vec<String>,

    /// Arguments appended after the host bundle path.
    pub args: Vec<String>,

    /// Debugger port passed as `--inspect=<port>`; 0 disables it.
    pub inspect: u16,

    /// Execution mode value.
    pub mode: String,

    /// Variable carrying the execution mode.
    pub mode_var: String,

    /// Variable carrying the content server URL.
    pub url_var: String,

    /// Additional environment overrides.
    pub env: BTreeMap<String, String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: vec!["electron".into()],
            args: Vec::new(),
            inspect: 9229,
            mode: "development".into(),
            mode_var: "NODE_ENV".into(),
            url_var: "ELECTRON_RENDERER_URL".into(),
            env: BTreeMap::new(),
        }
    }
}

impl HostConfig {
    /// Debugger port, if enabled.
    pub fn inspect_port(&self) -> Option<u16> {
        (self.inspect != 0).then_some(self.inspect)
    }

    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        validate_command("host.command", &self.command, root, diag);

        for (field, name) in [("host.mode_var", &self.mode_var), ("host.url_var", &self.url_var)] {
            if name.is_empty() || name.contains('=') {
                diag.error(field, format!("`{name}` is not a valid variable name"));
            }
        }

        if self.mode_var == self.url_var {
            diag.error("host.url_var", "must differ from host.mode_var");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_host_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.host.command, ["electron"]);
        assert_eq!(config.host.inspect_port(), Some(9229));
        assert_eq!(config.host.mode, "development");
        assert_eq!(config.host.mode_var, "NODE_ENV");
        assert_eq!(config.host.url_var, "ELECTRON_RENDERER_URL");
        assert!(config.host.env.is_empty());
    }

    #[test]
    fn test_inspect_disabled() {
        let config = test_parse_config("[host]\ninspect = 0");
        assert_eq!(config.host.inspect_port(), None);
    }

    #[test]
    fn test_host_env_table() {
        let config = test_parse_config("[host.env]\nELECTRON_ENABLE_LOGGING = \"1\"");
        assert_eq!(
            config.host.env.get("ELECTRON_ENABLE_LOGGING").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_rejects_bad_var_names() {
        let host = HostConfig {
            command: vec!["sh".into()],
            mode_var: String::new(),
            url_var: "A=B".into(),
            ..HostConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        host.validate(Path::new("/"), &mut diag);
        assert_eq!(diag.len(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_rejects_same_var() {
        let host = HostConfig {
            command: vec!["sh".into()],
            url_var: "NODE_ENV".into(),
            ..HostConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        host.validate(Path::new("/"), &mut diag);
        assert_eq!(diag.len(), 1);
    }
}
