//! Change watchers.
//!
//! A [`ChangeWatcher`] pushes [`ChangeEvent`]s for everything under a root
//! onto a channel. [`FileWatcher`] does this with the notify crate;
//! [`ManualWatcher`] lets the host (or a test) push events itself.

use crate::error::{Result, WatchError};
use notify::{Event, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Type of file change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Where a watcher delivers its events.
pub type EventSink = Sender<ChangeEvent>;

/// A source of filesystem change events for one root.
///
/// `stop` must drop the sink so the receiving side sees the channel close.
pub trait ChangeWatcher: Send {
    /// Starts delivering events for everything under `root`.
    fn start(&mut self, root: &Path, sink: EventSink) -> Result<()>;

    /// Stops delivering events. Calling it on a stopped watcher is a no-op.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Watches a directory tree using the platform's native notifications.
#[derive(Default)]
pub struct FileWatcher {
    watcher: Option<notify::RecommendedWatcher>,
}

impl FileWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeWatcher for FileWatcher {
    fn start(&mut self, root: &Path, sink: EventSink) -> Result<()> {
        if self.watcher.is_some() {
            return Err(WatchError::AlreadyRunning);
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_path_buf()));
        }

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let kind = match event.kind {
                        notify::EventKind::Create(_) => ChangeKind::Created,
                        notify::EventKind::Modify(_) => ChangeKind::Modified,
                        notify::EventKind::Remove(_) => ChangeKind::Deleted,
                        _ => return,
                    };

                    for path in event.paths {
                        debug!("{:?}: {}", kind, path.display());
                        if sink.send(ChangeEvent { path, kind }).is_err() {
                            // Receiver is gone, nobody is listening anymore
                            return;
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        info!("Watching {} for changes", root.display());
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the notify watcher drops its handler, and the sink with it
        if self.watcher.take().is_some() {
            debug!("File watcher stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.watcher.is_some()
    }
}

/// A watcher whose events are pushed by hand.
///
/// Clones share state, so one clone can be handed to a manager while
/// another is kept to call [`ManualWatcher::emit`].
#[derive(Clone, Default)]
pub struct ManualWatcher {
    sink: Arc<Mutex<Option<EventSink>>>,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one event. Returns false if the watcher isn't running or
    /// the receiving side has gone away.
    pub fn emit(&self, path: impl Into<PathBuf>, kind: ChangeKind) -> bool {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match sink.as_ref() {
            Some(tx) => tx.send(ChangeEvent::new(path, kind)).is_ok(),
            None => false,
        }
    }
}

impl ChangeWatcher for ManualWatcher {
    fn start(&mut self, _root: &Path, sink: EventSink) -> Result<()> {
        let mut slot = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(WatchError::AlreadyRunning);
        }
        *slot = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_running(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::channel;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = channel();
        let mut watcher = FileWatcher::new();
        assert!(watcher.start(dir.path(), tx).is_ok());
        assert!(watcher.is_running());

        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[test]
    fn test_watcher_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = channel();
        let err = FileWatcher::new()
            .start(&dir.path().join("missing"), tx)
            .unwrap_err();
        assert!(matches!(err, WatchError::NotADirectory(_)));
    }

    #[test]
    fn test_watcher_rejects_double_start() {
        let dir = tempdir().unwrap();
        let mut watcher = FileWatcher::new();
        watcher.start(dir.path(), channel().0).unwrap();
        let err = watcher.start(dir.path(), channel().0).unwrap_err();
        assert!(matches!(err, WatchError::AlreadyRunning));
    }

    #[test]
    fn test_watcher_detects_change() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (tx, rx) = channel();
        let mut watcher = FileWatcher::new();
        watcher.start(&root, tx).unwrap();

        let file_path = root.join(".autocoderignore");
        fs::write(&file_path, "*.log\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = false;
        while Instant::now() < deadline {
            if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
                if event.path == file_path {
                    seen = true;
                    break;
                }
            }
        }
        assert!(seen, "no event for {}", file_path.display());
    }

    #[test]
    fn test_stop_closes_channel() {
        let dir = tempdir().unwrap();
        let (tx, rx) = channel();
        let mut watcher = FileWatcher::new();
        watcher.start(dir.path(), tx).unwrap();
        watcher.stop();

        // All senders gone once the backend has wound down
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                _ if Instant::now() > deadline => panic!("channel still open after stop"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_manual_watcher_emits_only_while_running() {
        let handle = ManualWatcher::new();
        let mut watcher = handle.clone();
        assert!(!handle.emit("a", ChangeKind::Created));

        let (tx, rx) = channel();
        watcher.start(Path::new("/project"), tx).unwrap();
        assert!(handle.emit("/project/.autocoderignore", ChangeKind::Modified));
        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::new("/project/.autocoderignore", ChangeKind::Modified)
        );

        watcher.stop();
        assert!(!handle.is_running());
        assert!(!handle.emit("a", ChangeKind::Deleted));
        assert!(rx.recv().is_err());
    }
}
