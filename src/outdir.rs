//! Output directory management.
//!
//! The output directory holds both compiled bundles. It is emptied once at
//! startup so no stale artifact from an earlier run can be picked up, then
//! recreated before the first build writes into it.

use std::{io, path::Path};

use crate::log;

/// Outcome of [`empty`].
#[derive(Debug)]
pub enum Cleanup {
    /// The directory existed and was removed.
    Removed,
    /// Nothing to remove.
    Missing,
    /// Removal failed; the run continues with whatever is left.
    Failed(io::Error),
}

/// Create `path` and any missing parents. Existing directories are left alone.
pub fn ensure_exists(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Recursively remove `path`.
///
/// Never aborts the run: a missing directory is expected on a fresh checkout
/// and any other failure is logged.
pub fn empty(path: &Path) -> Cleanup {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            log!("clean"; "removed {}", path.display());
            Cleanup::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log!("clean"; "{} does not exist, nothing to clean", path.display());
            Cleanup::Missing
        }
        Err(e) => {
            log!("error"; "failed to clean {}: {}", path.display(), e);
            Cleanup::Failed(e)
        }
    }
}
