//! `[build]` section configuration.
//!
//! Controls how the bridge and host bundles are compiled.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "dist"                      # Shared output directory (emptied on start)
//! command = ["esbuild"]                # esbuild-compatible bundler CLI
//! target = "node22"                    # Runtime the bundles target
//! format = "cjs"                       # cjs | esm
//! sourcemap = true
//! external = ["electron", "fs", "path"]  # Provided by the host runtime
//!
//! [build.bridge]
//! entry = "packages/preload/src/preload.ts"
//! file = "preload.js"
//!
//! [build.host]
//! entry = "packages/main/src/main.ts"
//! file = "main.js"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Package runners that fetch the real tool on demand.
const PACKAGE_RUNNERS: &[&str] = &["npx", "bunx", "pnpx", "yarn", "pnpm"];

/// Module format of the compiled bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    Cjs,
    Esm,
}

impl BundleFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cjs => "cjs",
            Self::Esm => "esm",
        }
    }
}

/// One entry point and the file it compiles to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Entry module, relative to the project root.
    pub entry: PathBuf,
    /// Output file name inside the output directory.
    pub file: String,
}

/// Bundle build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory for both bundles and their source maps.
    pub output: PathBuf,

    /// Bundler command (program followed by fixed arguments).
    pub command: Vec<String>,

    /// Runtime version the bundles target.
    pub target: String,

    /// Module format.
    pub format: BundleFormat,

    /// Emit source maps next to each bundle.
    pub sourcemap: bool,

    /// Module names supplied by the host runtime at load time.
    pub external: Vec<String>,

    /// Bridge (preload) bundle.
    pub bridge: EntryConfig,

    /// Host process bundle.
    pub host: EntryConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            command: vec!["esbuild".into()],
            target: "node22".into(),
            format: BundleFormat::Cjs,
            sourcemap: true,
            external: vec!["electron".into(), "fs".into(), "path".into()],
            bridge: EntryConfig {
                entry: PathBuf::from("packages/preload/src/preload.ts"),
                file: "preload.js".into(),
            },
            host: EntryConfig {
                entry: PathBuf::from("packages/main/src/main.ts"),
                file: "main.js".into(),
            },
        }
    }
}

impl BuildConfig {
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        // Emptied on start: must never be the project itself
        if self.output == root || root.starts_with(&self.output) {
            diag.error_with_hint(
                "build.output",
                format!("{} would delete the project on start", self.output.display()),
                "point build.output at a dedicated directory such as `dist`",
            );
        }

        for (field, entry) in [("build.bridge", &self.bridge), ("build.host", &self.host)] {
            if !entry.entry.is_file() {
                diag.error(field, format!("entry {} not found", entry.entry.display()));
            }
            if entry.file.is_empty() || entry.file.contains(['/', '\\']) {
                diag.error(field, "file must be a plain file name");
            }
        }

        if self.bridge.file == self.host.file {
            diag.error_with_hint(
                "build.host.file",
                format!("both bundles write `{}`", self.host.file),
                "give the bridge and host bundles different file names",
            );
        }

        validate_command("build.command", &self.command, root, diag);
    }
}

/// Check that a command is non-empty and its program can be found.
///
/// Shared by `[build]` and `[host]`.
pub fn validate_command(
    field: &'static str,
    command: &[String],
    root: &Path,
    diag: &mut ConfigDiagnostics,
) {
    let Some(program) = command.first() else {
        diag.error(field, "command is empty");
        return;
    };

    if crate::utils::bin::resolve_program(root, program).is_some() {
        return;
    }

    if PACKAGE_RUNNERS.contains(&program.as_str()) {
        diag.hint(field, format!("`{program}` not found on PATH"));
    } else {
        diag.error_with_hint(
            field,
            format!("`{program}` not found"),
            format!("install it into node_modules or update {field}"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use tempfile::TempDir;

    fn project() -> (TempDir, BuildConfig) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let mut build = BuildConfig::default();
        build.output = root.join("dist");
        build.bridge.entry = root.join("preload.ts");
        build.host.entry = root.join("main.ts");
        std::fs::write(&build.bridge.entry, "").unwrap();
        std::fs::write(&build.host.entry, "").unwrap();
        // `sh` stands in for the bundler: only its presence is checked
        build.command = vec!["sh".into()];
        (temp, build)
    }

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.target, "node22");
        assert_eq!(config.build.format, BundleFormat::Cjs);
        assert!(config.build.sourcemap);
        assert_eq!(config.build.external, ["electron", "fs", "path"]);
        assert_eq!(config.build.host.file, "main.js");
        assert_eq!(config.build.bridge.file, "preload.js");
    }

    #[test]
    fn test_build_config_entries() {
        let config = test_parse_config(
            "[build]\nformat = \"esm\"\n[build.host]\nentry = \"src/main.ts\"\nfile = \"host.mjs\"",
        );
        assert_eq!(config.build.format, BundleFormat::Esm);
        assert_eq!(config.build.host.entry, PathBuf::from("src/main.ts"));
        assert_eq!(config.build.host.file, "host.mjs");
        // untouched entry keeps its default
        assert_eq!(config.build.bridge.file, "preload.js");
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_ok() {
        let (temp, build) = project();
        let mut diag = ConfigDiagnostics::new();
        build.validate(temp.path(), &mut diag);
        assert!(diag.is_empty(), "{:?}", diag.errors());
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_rejects_root_as_output() {
        let (temp, mut build) = project();
        build.output = temp.path().to_path_buf();
        let mut diag = ConfigDiagnostics::new();
        build.validate(temp.path(), &mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_rejects_ancestor_output() {
        let (temp, mut build) = project();
        build.output = temp.path().parent().unwrap().to_path_buf();
        let mut diag = ConfigDiagnostics::new();
        build.validate(temp.path(), &mut diag);
        assert!(!diag.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_rejects_same_file() {
        let (temp, mut build) = project();
        build.bridge.file = "main.js".into();
        let mut diag = ConfigDiagnostics::new();
        build.validate(temp.path(), &mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_missing_entry() {
        let (temp, build) = project();
        std::fs::remove_file(&build.host.entry).unwrap();
        let mut diag = ConfigDiagnostics::new();
        build.validate(temp.path(), &mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_validate_command_empty_and_missing() {
        let temp = TempDir::new().unwrap();
        let mut diag = ConfigDiagnostics::new();
        validate_command("build.command", &[], temp.path(), &mut diag);
        validate_command(
            "build.command",
            &["devloop-no-such-bundler".into()],
            temp.path(),
            &mut diag,
        );
        assert_eq!(diag.len(), 2);
    }
}
