//! Project configuration management for `devloop.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build], [build.bridge], [build.host]
//! │   ├── host       # [host], [host.env]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   └── error      # ConfigError, ConfigDiagnostics
//! └── mod.rs         # DevConfig (this file)
//! ```
//!
//! Every field has a default, so the file is optional: without one the
//! project root is the current directory.

pub mod section;
pub mod types;
mod util;

use util::{expand_tilde, find_config_file};

pub use section::{BuildConfig, BundleFormat, EntryConfig, HostConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError};

use crate::{cli::Cli, debug, log, utils::path::normalize_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing devloop.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// Absolute path to the config file, whether or not it exists
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file
    #[serde(skip)]
    pub root: PathBuf,

    /// Content server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Bundle build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Host process settings
    #[serde(default)]
    pub host: HostConfig,
}

impl DevConfig {
    /// Load configuration for this invocation.
    ///
    /// Searches upward from cwd for the config file; falls back to defaults
    /// rooted at cwd when none exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cwd, &cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map_or_else(|| cwd.clone(), Path::to_path_buf);

        config.config_path = normalize_path(&config_path);
        config.apply_cli(cli);
        config.normalize_paths(&root);
        config.validate()?;

        Ok(config)
    }

    /// Default configuration rooted at `root`, with paths normalized.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.config_path = root.join("devloop.toml");
        config.normalize_paths(root);
        config
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Shared output directory of both bundles.
    pub fn output_dir(&self) -> &Path {
        &self.build.output
    }

    /// Compiled host bundle, the entry point handed to the host runtime.
    pub fn host_bundle(&self) -> PathBuf {
        self.build.output.join(&self.build.host.file)
    }

    /// URL the host process loads its UI from.
    pub fn renderer_url(&self) -> String {
        self.serve.url()
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply CLI overrides on top of file values.
    fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        if cli.no_inspect {
            self.host.inspect = 0;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        let resolve = |path: &Path| normalize_path(&root.join(expand_tilde(path)));

        self.build.output = resolve(&self.build.output);
        self.build.bridge.entry = resolve(&self.build.bridge.entry);
        self.build.host.entry = resolve(&self.build.host.entry);
        self.serve.root = resolve(&self.serve.root);
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the whole configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&self.root, &mut diag);
        self.build.validate(&self.root, &mut diag);
        self.host.validate(&self.root, &mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
