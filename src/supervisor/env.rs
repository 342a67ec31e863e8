//! Host process command line and environment.

use std::{
    ffi::{OsStr, OsString},
    path::PathBuf,
};

use rustc_hash::FxHashMap;

use crate::config::DevConfig;

/// Everything needed to spawn one host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Complete environment, not a delta.
    pub envs: FxHashMap<OsString, OsString>,
    pub cwd: PathBuf,
}

impl HostCommand {
    /// Build the host command from config on top of `base` (usually the
    /// current process environment).
    ///
    /// Arguments: `command[1..] [--inspect=<port>] <host bundle> args...`
    pub fn from_config<I>(config: &DevConfig, base: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let host = &config.host;
        let mut command = host.command.iter().map(OsString::from);
        let program = command.next().unwrap_or_default();

        let mut args: Vec<OsString> = command.collect();
        if let Some(port) = host.inspect_port() {
            args.push(format!("--inspect={port}").into());
        }
        args.push(config.host_bundle().into_os_string());
        args.extend(host.args.iter().map(OsString::from));

        let overrides = host
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .chain([
                (host.mode_var.as_str(), host.mode.clone()),
                (host.url_var.as_str(), config.renderer_url()),
            ]);

        Self {
            program,
            args,
            envs: merge_env(base, overrides),
            cwd: config.get_root().to_path_buf(),
        }
    }

    /// Program name for log lines.
    pub fn display_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }
}

/// Base environment with overrides applied in order; later keys win.
pub fn merge_env<I, K, V, O>(base: I, overrides: O) -> FxHashMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
    O: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: Into<OsString>,
{
    let mut envs: FxHashMap<OsString, OsString> = base.into_iter().collect();
    for (key, value) in overrides {
        envs.insert(key.as_ref().to_owned(), value.into());
    }
    envs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn os(s: &str) -> OsString {
        OsString::from(s)
    }

    fn base() -> Vec<(OsString, OsString)> {
        vec![
            (os("PATH"), os("/usr/bin")),
            (os("NODE_ENV"), os("production")),
        ]
    }

    #[test]
    fn test_merge_env_overrides_win() {
        let envs = merge_env(base(), [("NODE_ENV", "development"), ("EXTRA", "1")]);
        assert_eq!(envs[&os("NODE_ENV")], os("development"));
        assert_eq!(envs[&os("PATH")], os("/usr/bin"));
        assert_eq!(envs[&os("EXTRA")], os("1"));
    }

    #[test]
    fn test_from_config_defaults() {
        let temp = TempDir::new().unwrap();
        let config = DevConfig::with_root(temp.path());
        let cmd = HostCommand::from_config(&config, base());

        assert_eq!(cmd.program, os("electron"));
        assert_eq!(
            cmd.args,
            [
                os("--inspect=9229"),
                config.host_bundle().into_os_string()
            ]
        );
        assert_eq!(cmd.envs[&os("NODE_ENV")], os("development"));
        assert_eq!(
            cmd.envs[&os("ELECTRON_RENDERER_URL")],
            os("http://127.0.0.1:5173")
        );
        assert_eq!(cmd.envs[&os("PATH")], os("/usr/bin"));
        assert_eq!(cmd.cwd, config.get_root());
    }

    #[test]
    fn test_from_config_custom_command() {
        let temp = TempDir::new().unwrap();
        let mut config = DevConfig::with_root(temp.path());
        config.host.command = vec!["node".into(), "--enable-source-maps".into()];
        config.host.args = vec!["--no-sandbox".into()];
        config.host.inspect = 0;

        let cmd = HostCommand::from_config(&config, Vec::new());
        assert_eq!(cmd.program, os("node"));
        assert_eq!(
            cmd.args,
            [
                os("--enable-source-maps"),
                config.host_bundle().into_os_string(),
                os("--no-sandbox")
            ]
        );
    }

    #[test]
    fn test_fixed_variables_beat_env_table() {
        let temp = TempDir::new().unwrap();
        let mut config = DevConfig::with_root(temp.path());
        config.host.env.insert("NODE_ENV".into(), "test".into());
        config.host.env.insert("ELECTRON_ENABLE_LOGGING".into(), "1".into());

        let cmd = HostCommand::from_config(&config, base());
        assert_eq!(cmd.envs[&os("NODE_ENV")], os("development"));
        assert_eq!(cmd.envs[&os("ELECTRON_ENABLE_LOGGING")], os("1"));
    }

    #[test]
    fn test_display_name() {
        let cmd = HostCommand {
            program: os("/app/node_modules/.bin/electron"),
            args: Vec::new(),
            envs: FxHashMap::default(),
            cwd: PathBuf::from("/app"),
        };
        assert_eq!(cmd.display_name(), "electron");
    }
}
