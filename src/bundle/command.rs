//! Bundler driven through an esbuild-compatible CLI.
//!
//! Command line: `command... <entry> --bundle --platform=node --format=<fmt>
//! --target=<target> --outfile=<out>/<file> [--sourcemap] [--external:<m>...]
//! --log-level=warning`

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result, anyhow, bail};

use super::{BuildResult, Bundle, Bundler};
use crate::config::{BundleFormat, DevConfig};
use crate::utils::{
    bin::resolve_program,
    exec::{Cmd, FilterRule},
};

/// esbuild's summary lines are noise next to our own build log.
static BUNDLER_FILTER: FilterRule = FilterRule::new(&["⚡ Done", "Done in"]);

/// Runs the configured bundler command once per bundle.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    root: PathBuf,
    command: Vec<String>,
    target: String,
    format: BundleFormat,
    sourcemap: bool,
    external: Vec<String>,
}

impl CommandBundler {
    pub fn new(config: &DevConfig) -> Self {
        Self {
            root: config.get_root().to_path_buf(),
            command: config.build.command.clone(),
            target: config.build.target.clone(),
            format: config.build.format,
            sourcemap: config.build.sourcemap,
            external: config.build.external.clone(),
        }
    }

    /// Bundler arguments after the configured command.
    fn args(&self, bundle: &Bundle, out_dir: &Path) -> Vec<String> {
        let mut args = vec![
            bundle.entry.display().to_string(),
            "--bundle".into(),
            "--platform=node".into(),
            format!("--format={}", self.format.as_str()),
            format!("--target={}", self.target),
            format!("--outfile={}", bundle.output(out_dir).display()),
        ];
        if self.sourcemap {
            args.push("--sourcemap".into());
        }
        args.extend(self.external.iter().map(|m| format!("--external:{m}")));
        args.push("--log-level=warning".into());
        args
    }
}

impl Bundler for CommandBundler {
    fn compile(&self, bundle: &Bundle, out_dir: &Path) -> Result<BuildResult> {
        let program = self
            .command
            .first()
            .ok_or_else(|| anyhow!("bundler command is empty"))?;
        let resolved = resolve_program(&self.root, program)
            .ok_or_else(|| anyhow!("bundler `{program}` not found"))?;

        let start = Instant::now();
        Cmd::from_slice(&self.command)
            .program(&resolved)
            .args(self.args(bundle, out_dir))
            .cwd(&self.root)
            .filter(&BUNDLER_FILTER)
            .run()
            .with_context(|| format!("failed to build {} bundle", bundle.name))?;

        let output = bundle.output(out_dir);
        if !output.is_file() {
            bail!(
                "bundler exited successfully but {} was not written",
                output.display()
            );
        }

        Ok(BuildResult {
            output,
            elapsed: start.elapsed(),
        })
    }
}
