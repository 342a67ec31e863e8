//! Graceful termination of child processes.
//!
//! Children get SIGTERM first so they can run their quit handlers, and
//! SIGKILL only if they are still around after a grace period. Platforms
//! without signals go straight to [`Child::kill`].

use std::{
    io,
    process::{Child, ExitStatus},
    thread,
    time::{Duration, Instant},
};

/// Time a child gets between SIGTERM and SIGKILL.
pub const TERM_GRACE: Duration = Duration::from_secs(3);

/// Exit check interval during the grace period.
const POLL: Duration = Duration::from_millis(20);

/// Stop `child` and reap it.
///
/// A child that already exited is not an error; its status is returned.
pub fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    if request_exit(child.id()) {
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(POLL);
        }
        crate::debug!("process"; "pid {} ignored SIGTERM for {:?}, killing", child.id(), grace);
    }

    match child.kill() {
        Ok(()) => {}
        // Exited between the last check and the kill
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => return Err(e),
    }
    child.wait()
}

/// Send SIGTERM. Returns whether the signal was delivered.
#[cfg(unix)]
fn request_exit(pid: u32) -> bool {
    use nix::{
        sys::signal::{Signal, kill},
        unistd::Pid,
    };

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            crate::debug!("process"; "SIGTERM to pid {} failed: {}", pid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn request_exit(_pid: u32) -> bool {
    false
}
