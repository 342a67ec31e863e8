//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve a request URL to a file under `root`.
///
/// - Directories serve their `index.html`
/// - Extension-less routes that match nothing serve the root `index.html`,
///   so client-side routers can own the path
/// - Anything escaping `root` (`..`, symlinks) resolves to nothing
pub fn resolve(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let root = root.canonicalize().ok()?;
    resolve_existing(&root.join(&clean), &root).or_else(|| spa_fallback(&clean, &root))
}

fn resolve_existing(local: &Path, root: &Path) -> Option<PathBuf> {
    // Canonicalize to resolve symlinks and verify path is under root
    let canonical = local.canonicalize().ok()?;
    if !canonical.starts_with(root) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

fn spa_fallback(clean: &str, root: &Path) -> Option<PathBuf> {
    let last = clean.rsplit('/').next().unwrap_or_default();
    if Path::new(last).extension().is_some() {
        return None;
    }
    let index = root.join("index.html");
    index.is_file().then_some(index)
}

/// Normalize URL: strip query string and fragment, decode, trim slashes
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    decoded.trim_matches('/').to_string()
}
