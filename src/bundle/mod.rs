//! Bundle builds.
//!
//! Two entry points are compiled into the shared output directory: the
//! bridge (preload) bundle, then the host bundle. Each build is a single
//! bundler invocation; the output directory is never cleared here.
//!
//! The bundler itself is external. [`Bundler`] is the seam: production
//! uses [`CommandBundler`], tests substitute a fake that writes files.

mod command;

pub use command::CommandBundler;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;

use crate::config::{DevConfig, EntryConfig};

/// One entry point to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Short name for log lines (`bridge`, `host`).
    pub name: &'static str,
    /// Absolute path of the entry module.
    pub entry: PathBuf,
    /// Output file name inside the output directory.
    pub file: String,
}

impl Bundle {
    fn from_entry(name: &'static str, entry: &EntryConfig) -> Self {
        Self {
            name,
            entry: entry.entry.clone(),
            file: entry.file.clone(),
        }
    }

    /// The bridge bundle loaded into the UI context.
    pub fn bridge(config: &DevConfig) -> Self {
        Self::from_entry("bridge", &config.build.bridge)
    }

    /// The host process bundle.
    pub fn host(config: &DevConfig) -> Self {
        Self::from_entry("host", &config.build.host)
    }

    /// Where the compiled bundle lands.
    pub fn output(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(&self.file)
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Compiles a single entry point into `out_dir`.
pub trait Bundler {
    fn compile(&self, bundle: &Bundle, out_dir: &Path) -> Result<BuildResult>;
}

/// Build the bridge bundle, then the host bundle.
///
/// Stops at the first failure. The host bundle is built last so that its
/// appearance in the output directory means both are in place.
pub fn build_all<B: Bundler + ?Sized>(bundler: &B, config: &DevConfig) -> Result<Vec<BuildResult>> {
    let out_dir = config.output_dir();
    let mut results = Vec::with_capacity(2);

    for bundle in [Bundle::bridge(config), Bundle::host(config)] {
        crate::debug!("build"; "compiling {}", bundle.entry.display());
        let result = bundler.compile(&bundle, out_dir)?;
        crate::debug!("build"; "wrote {}", result.output.display());
        crate::log!(
            "build";
            "{} bundle → {} ({} ms)",
            bundle.name,
            bundle.file,
            result.elapsed.as_millis()
        );
        results.push(result);
    }

    Ok(results)
}
