//! Host processes backed by `std::process`.

use std::{
    ffi::OsString,
    io,
    process::{Child, Command, ExitStatus, Stdio},
};

use super::{HostChild, HostCommand, Launcher};
use crate::utils::{
    bin::resolve_program,
    process::{TERM_GRACE, terminate},
};

/// Spawns real host processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    type Child = HostProcess;

    fn spawn(&self, cmd: &HostCommand) -> io::Result<HostProcess> {
        let program = cmd
            .program
            .to_str()
            .and_then(|name| resolve_program(&cmd.cwd, name))
            .map_or_else(|| cmd.program.clone(), OsString::from);

        let child = Command::new(program)
            .args(&cmd.args)
            .env_clear()
            .envs(&cmd.envs)
            .current_dir(&cmd.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        Ok(HostProcess { child })
    }
}

/// A running host process.
#[derive(Debug)]
pub struct HostProcess {
    child: Child,
}

impl HostChild for HostProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    /// SIGTERM, then SIGKILL after [`TERM_GRACE`]. Reaps the child either way.
    fn kill(&mut self) -> io::Result<()> {
        terminate(&mut self.child, TERM_GRACE).map(drop)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }
}
