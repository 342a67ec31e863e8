//! Program lookup for project-local tools.
//!
//! Bundlers and host runtimes are usually installed as dev dependencies,
//! so `node_modules/.bin` under the project root is searched before `PATH`.

use std::path::{Path, PathBuf};

/// Directory holding package manager shims, relative to the project root.
const LOCAL_BIN_DIR: &str = "node_modules/.bin";

/// Resolve `program` to an executable path.
///
/// - Names containing a path separator are taken relative to `root`
/// - Otherwise `node_modules/.bin` is searched first, then `PATH`
pub fn resolve_program(root: &Path, program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    if program.contains(['/', '\\']) {
        let path = root.join(program);
        return path.is_file().then_some(path);
    }

    local_bin(root, program).or_else(|| which::which(program).ok())
}

fn local_bin(root: &Path, program: &str) -> Option<PathBuf> {
    let dir = root.join(LOCAL_BIN_DIR);
    if !dir.is_dir() {
        return None;
    }
    // Shims are `.cmd` files on Windows
    which::which_in(program, Some(&dir), root).ok()
}
