//! Directory watching.
//!
//! A `notify` watcher whose callback filters raw events into
//! [`ChangeEvent`]s and forwards them on a channel. The callback runs on
//! notify's thread and does nothing else: consumers decide what a change
//! means.
//!
//! Events are not debounced. A rebuild that writes two files produces at
//! least two events and the consumer sees every one of them.

use std::path::{Path, PathBuf};

use crossbeam::channel::Sender;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};

/// What happened to the watched paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// A filtered filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    /// Convert a raw notify event, dropping noise.
    ///
    /// Access events and metadata-only modifications (mtime, chmod) are
    /// ignored, as are editor temp files.
    pub fn from_notify(event: &notify::Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Metadata(_)) => return None,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return None,
        };

        let paths: Vec<_> = event
            .paths
            .iter()
            .filter(|path| !is_temp_file(path))
            .cloned()
            .collect();

        (!paths.is_empty()).then_some(Self { kind, paths })
    }

    /// First path for log lines.
    pub fn describe(&self) -> String {
        match self.paths.as_slice() {
            [] => self.kind.label().to_string(),
            [path] => format!("{} {}", path.display(), self.kind.label()),
            [path, rest @ ..] => format!(
                "{} (+{}) {}",
                path.display(),
                rest.len(),
                self.kind.label()
            ),
        }
    }
}

/// Editor swap and backup files.
fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
        || name.starts_with(".#")
}

/// Recursive watch on a directory, alive as long as this value is.
pub struct OutputWatcher {
    _watcher: RecommendedWatcher,
}

impl OutputWatcher {
    /// Start watching `path`, sending every change on `tx`.
    ///
    /// `path` must exist.
    pub fn spawn(path: &Path, tx: Sender<ChangeEvent>) -> notify::Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
                    if let Some(change) = ChangeEvent::from_notify(&event) {
                        // Receiver gone means shutdown is underway
                        let _ = tx.send(change);
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })?;
        watcher.watch(path, RecursiveMode::Recursive)?;

        crate::debug!("watch"; "watching {}", path.display());
        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_event(paths: Vec<&str>, kind: EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify_kind() -> EventKind {
        EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Any))
    }

    #[test]
    fn test_from_notify_kinds() {
        let created = make_event(
            vec!["/dist/main.js"],
            EventKind::Create(notify::event::CreateKind::File),
        );
        assert_eq!(
            ChangeEvent::from_notify(&created).map(|e| e.kind),
            Some(ChangeKind::Created)
        );

        let modified = make_event(vec!["/dist/main.js"], modify_kind());
        assert_eq!(
            ChangeEvent::from_notify(&modified).map(|e| e.kind),
            Some(ChangeKind::Modified)
        );

        let removed = make_event(
            vec!["/dist/main.js"],
            EventKind::Remove(notify::event::RemoveKind::File),
        );
        assert_eq!(
            ChangeEvent::from_notify(&removed).map(|e| e.kind),
            Some(ChangeKind::Removed)
        );
    }

    #[test]
    fn test_from_notify_ignores_noise() {
        let metadata = make_event(
            vec!["/dist/main.js"],
            EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any)),
        );
        assert!(ChangeEvent::from_notify(&metadata).is_none());

        let access = make_event(
            vec!["/dist/main.js"],
            EventKind::Access(notify::event::AccessKind::Any),
        );
        assert!(ChangeEvent::from_notify(&access).is_none());

        let swap = make_event(vec!["/dist/.main.js.swp"], modify_kind());
        assert!(ChangeEvent::from_notify(&swap).is_none());
    }

    #[test]
    fn test_from_notify_keeps_real_paths() {
        let event = make_event(vec!["/dist/main.js~", "/dist/main.js"], modify_kind());
        let change = ChangeEvent::from_notify(&event).unwrap();
        assert_eq!(change.paths, [PathBuf::from("/dist/main.js")]);
    }

    #[test]
    fn test_describe() {
        let change = ChangeEvent {
            kind: ChangeKind::Modified,
            paths: vec![PathBuf::from("dist/main.js"), PathBuf::from("dist/main.js.map")],
        };
        assert_eq!(change.describe(), "dist/main.js (+1) modified");
    }

    #[test]
    fn test_watcher_delivers_write() {
        let temp = TempDir::new().unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();
        let _watcher = OutputWatcher::spawn(temp.path(), tx).unwrap();

        std::fs::write(temp.path().join("main.js"), "module.exports = {}").unwrap();

        let change = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(change.paths.iter().any(|p| p.ends_with("main.js")));
    }

    #[test]
    fn test_watcher_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = crossbeam::channel::unbounded();
        assert!(OutputWatcher::spawn(&temp.path().join("dist"), tx).is_err());
    }
}
