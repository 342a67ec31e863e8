//! Supervisor tests and the fake launcher shared with orchestrator tests.

use std::{cell::RefCell, ffi::OsString, path::PathBuf, rc::Rc};

use rustc_hash::{FxHashMap, FxHashSet};

use super::*;

// ============================================================================
// Fake launcher
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct LaunchLog {
    pub spawned: usize,
    pub killed: Vec<u32>,
    pub live: FxHashSet<u32>,
    pub fail_spawn: bool,
    /// Fired after each successful spawn, to request shutdown mid-run.
    pub on_spawn: Option<crossbeam::channel::Sender<()>>,
}

/// Counts spawns and kills; hands out pids 1, 2, 3...
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeLauncher {
    pub log: Rc<RefCell<LaunchLog>>,
}

impl FakeLauncher {
    pub fn failing() -> Self {
        let launcher = Self::default();
        launcher.log.borrow_mut().fail_spawn = true;
        launcher
    }

    pub fn spawned(&self) -> usize {
        self.log.borrow().spawned
    }

    pub fn live(&self) -> usize {
        self.log.borrow().live.len()
    }
}

pub(crate) struct FakeChild {
    id: u32,
    log: Rc<RefCell<LaunchLog>>,
}

impl Launcher for FakeLauncher {
    type Child = FakeChild;

    fn spawn(&self, _cmd: &HostCommand) -> io::Result<FakeChild> {
        let mut log = self.log.borrow_mut();
        if log.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        log.spawned += 1;
        let id = log.spawned as u32;
        log.live.insert(id);
        if let Some(tx) = &log.on_spawn {
            let _ = tx.try_send(());
        }
        Ok(FakeChild {
            id,
            log: Rc::clone(&self.log),
        })
    }
}

impl HostChild for FakeChild {
    fn id(&self) -> u32 {
        self.id
    }

    fn kill(&mut self) -> io::Result<()> {
        let mut log = self.log.borrow_mut();
        log.killed.push(self.id);
        log.live.remove(&self.id);
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Ok(None)
    }
}

pub(crate) fn command() -> HostCommand {
    HostCommand {
        program: OsString::from("electron"),
        args: vec![OsString::from("dist/main.js")],
        envs: FxHashMap::default(),
        cwd: PathBuf::from("."),
    }
}

// ============================================================================
// Supervisor with fakes
// ============================================================================

#[test]
fn test_restart_from_stopped() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());
    assert!(!supervisor.is_running());

    assert_eq!(supervisor.restart().unwrap(), 1);
    assert!(supervisor.is_running());
    assert_eq!(launcher.spawned(), 1);
    assert!(launcher.log.borrow().killed.is_empty());
}

#[test]
fn test_restart_kills_previous() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());

    let first = supervisor.restart().unwrap();
    let second = supervisor.restart().unwrap();

    assert_ne!(first, second);
    assert_eq!(launcher.log.borrow().killed, [first]);
    assert_eq!(launcher.live(), 1);
}

#[test]
fn test_consecutive_restarts_leave_one_child() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());

    supervisor.restart().unwrap();
    supervisor.restart().unwrap();
    supervisor.restart().unwrap();

    assert_eq!(launcher.spawned(), 3);
    assert_eq!(launcher.live(), 1);
    assert_eq!(launcher.log.borrow().killed.len(), 2);
}

#[test]
fn test_stop_is_idempotent() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());

    supervisor.stop();
    supervisor.restart().unwrap();
    supervisor.stop();
    supervisor.stop();

    assert!(!supervisor.is_running());
    assert_eq!(launcher.log.borrow().killed.len(), 1);
    assert_eq!(launcher.live(), 0);
}

#[test]
fn test_failed_spawn_leaves_stopped() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());
    supervisor.restart().unwrap();

    launcher.log.borrow_mut().fail_spawn = true;
    let err = supervisor.restart().unwrap_err();

    assert!(err.to_string().contains("failed to spawn `electron`"));
    assert!(!supervisor.is_running());
    assert_eq!(launcher.live(), 0);
}

#[test]
fn test_drop_stops_child() {
    let launcher = FakeLauncher::default();
    {
        let mut supervisor = Supervisor::new(&launcher, command());
        supervisor.restart().unwrap();
        assert_eq!(launcher.live(), 1);
    }
    assert_eq!(launcher.live(), 0);
}

#[test]
fn test_poll_exit_while_running() {
    let launcher = FakeLauncher::default();
    let mut supervisor = Supervisor::new(&launcher, command());
    assert!(supervisor.poll_exit().is_none());

    supervisor.restart().unwrap();
    assert!(supervisor.poll_exit().is_none());
    assert!(supervisor.is_running());
}

// ============================================================================
// Real processes
// ============================================================================

#[cfg(unix)]
fn sh(script: &str) -> HostCommand {
    HostCommand {
        program: OsString::from("sh"),
        args: vec![OsString::from("-c"), OsString::from(script)],
        envs: std::env::vars_os().collect(),
        cwd: std::env::temp_dir(),
    }
}

#[test]
#[cfg(unix)]
fn test_process_poll_exit_reaps() {
    use std::time::{Duration, Instant};

    let launcher = ProcessLauncher;
    let mut supervisor = Supervisor::new(&launcher, sh("exit 3"));
    supervisor.restart().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = supervisor.poll_exit() {
            break status;
        }
        assert!(Instant::now() < deadline, "child did not exit");
        std::thread::sleep(Duration::from_millis(20));
    };

    assert_eq!(status.code(), Some(3));
    assert!(!supervisor.is_running());
}

#[test]
#[cfg(unix)]
fn test_process_restart_kills_long_running() {
    let launcher = ProcessLauncher;
    let mut supervisor = Supervisor::new(&launcher, sh("sleep 30"));

    supervisor.restart().unwrap();
    supervisor.restart().unwrap();
    assert!(supervisor.poll_exit().is_none());

    supervisor.stop();
    assert!(!supervisor.is_running());
}

#[test]
#[cfg(unix)]
fn test_process_stop_lets_host_quit_cleanly() {
    use std::time::Duration;
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("quit.txt");
    let script = format!(
        "trap 'echo quit > \"{}\"; exit 0' TERM; while :; do sleep 0.05; done",
        marker.display()
    );

    let launcher = ProcessLauncher;
    let mut supervisor = Supervisor::new(&launcher, sh(&script));
    supervisor.restart().unwrap();
    // Give the shell time to install its trap
    std::thread::sleep(Duration::from_millis(200));

    supervisor.stop();
    assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "quit");
}

#[test]
#[cfg(unix)]
fn test_process_receives_environment() {
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let out = temp.path().join("env.txt");
    let mut cmd = sh(&format!("echo \"$DEVLOOP_TEST_URL\" > '{}'", out.display()));
    cmd.envs.insert(
        OsString::from("DEVLOOP_TEST_URL"),
        OsString::from("http://localhost:5173"),
    );

    let launcher = ProcessLauncher;
    let mut child = launcher.spawn(&cmd).unwrap();
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    };

    assert!(status.success());
    assert_eq!(
        std::fs::read_to_string(out).unwrap().trim(),
        "http://localhost:5173"
    );
}

#[test]
fn test_process_missing_program() {
    let mut cmd = command();
    cmd.program = OsString::from("devloop-no-such-host");
    assert!(ProcessLauncher.spawn(&cmd).is_err());
}
