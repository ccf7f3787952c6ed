//! The ignore manager - one live rule set per project root.
//!
//! The manager keeps the current [`RuleSet`] as an `Arc` snapshot. Queries
//! clone the `Arc` and evaluate without holding any lock; reloads build a
//! complete new rule set first and then swap the pointer. A query therefore
//! sees either the old rules or the new ones, never a mix.
//!
//! Change events arrive over a channel and are drained on a dedicated
//! thread, which only holds a weak reference back to the manager.

use crate::error::Result;
use crate::watcher::{ChangeEvent, ChangeWatcher, FileWatcher};
use autoignore_core::{relative_to, IgnoreConfig, IgnoreError, Pattern, RuleSet, RuleSetLoader};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Serving queries; reloads may happen at any time.
    Active,
    /// Shut down. Queries still answer from the last rules, but no more
    /// change events are processed.
    TornDown,
}

struct Subscription {
    watcher: Box<dyn ChangeWatcher>,
    drain: Option<JoinHandle<()>>,
}

/// Answers ignore queries for one project root and keeps the answers in
/// step with the rules file.
pub struct IgnoreManager {
    root: PathBuf,
    // The root as the caller spelled it, made absolute; may go through symlinks
    given_root: PathBuf,
    loader: RuleSetLoader,
    current: RwLock<Arc<RuleSet>>,
    // Serializes load + swap so an older load can't land after a newer one
    reload_lock: Mutex<()>,
    generation: Mutex<u64>,
    reloaded: Condvar,
    subscription: Mutex<Option<Subscription>>,
    torn_down: AtomicBool,
}

impl IgnoreManager {
    /// Creates a manager that only reloads when asked to.
    ///
    /// Fails if `root` can't be resolved to an existing directory.
    pub fn new(root: &Path, config: IgnoreConfig) -> Result<Arc<Self>> {
        let given_root = lexical_absolute(root).map_err(|e| IgnoreError::io(root, e))?;
        let root = fs::canonicalize(root).map_err(|e| IgnoreError::io(root, e))?;
        let loader = RuleSetLoader::new(config);
        let rules = loader.load(&root);

        info!(
            "Loaded {} ignore patterns for {}",
            rules.len(),
            root.display()
        );

        Ok(Arc::new(Self {
            root,
            given_root,
            loader,
            current: RwLock::new(Arc::new(rules)),
            reload_lock: Mutex::new(()),
            generation: Mutex::new(0),
            reloaded: Condvar::new(),
            subscription: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }))
    }

    /// Creates a manager and subscribes it to `watcher`.
    ///
    /// If the watcher can't start, the manager still works with the rules
    /// loaded here; only automatic reloading is lost.
    pub fn with_watcher(
        root: &Path,
        config: IgnoreConfig,
        watcher: Box<dyn ChangeWatcher>,
    ) -> Result<Arc<Self>> {
        let manager = Self::new(root, config)?;
        manager.subscribe(watcher);
        Ok(manager)
    }

    /// Creates a manager backed by a [`FileWatcher`], unless the config
    /// turns watching off.
    pub fn watching(root: &Path, config: IgnoreConfig) -> Result<Arc<Self>> {
        if config.watch {
            Self::with_watcher(root, config, Box::new(FileWatcher::new()))
        } else {
            Self::new(root, config)
        }
    }

    fn subscribe(self: &Arc<Self>, mut watcher: Box<dyn ChangeWatcher>) {
        let (tx, rx) = mpsc::channel::<ChangeEvent>();

        if let Err(e) = watcher.start(&self.root, tx) {
            warn!(
                "Change watcher unavailable for {} ({}); rules will only reload on demand",
                self.root.display(),
                e
            );
            return;
        }

        let weak = Arc::downgrade(self);
        let drain = thread::Builder::new()
            .name("autoignore-reload".into())
            .spawn(move || {
                for event in rx {
                    let Some(manager) = weak.upgrade() else {
                        break;
                    };
                    manager.on_change(&event);
                }
                debug!("Reload thread exiting");
            });

        match drain {
            Ok(handle) => {
                let mut slot = self.subscription.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = Some(Subscription {
                    watcher,
                    drain: Some(handle),
                });
            }
            Err(e) => {
                warn!("Failed to spawn reload thread: {}", e);
                watcher.stop();
            }
        }
    }

    /// Returns whether `path` should be skipped.
    ///
    /// `path` may be absolute or relative. Relative paths are taken from
    /// the current directory when that lies inside the root, and from the
    /// root otherwise. An empty path, or one outside the root, is never
    /// ignored.
    pub fn should_ignore(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            debug!("Empty path passed to should_ignore");
            return false;
        }

        let Some(relative) = self.relative_path(path) else {
            debug!("{} is outside {}", path.display(), self.root.display());
            return false;
        };

        let is_dir = self.is_dir(path, &relative);
        self.rules().is_ignored(&relative, is_dir)
    }

    /// The pattern that decides `path`, resolved the same way as
    /// [`should_ignore`](Self::should_ignore).
    pub fn matching_pattern(&self, path: impl AsRef<Path>) -> Option<Pattern> {
        let path = path.as_ref();
        let relative = self.relative_path(path)?;
        let is_dir = self.is_dir(path, &relative);
        self.rules().matching_pattern(&relative, is_dir).cloned()
    }

    /// Whether `path` is treated as a directory: a trailing separator says
    /// so even before it exists, otherwise the disk decides.
    pub fn is_dir(&self, path: &Path, relative: &str) -> bool {
        has_trailing_separator(path) || self.root.join(relative).is_dir()
    }

    /// Resolves `path` to the root-relative form rules are matched against.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_for_relative().join(path)
        };
        self.relative_to_root(&absolute)
    }

    fn relative_to_root(&self, absolute: &Path) -> Option<String> {
        relative_to(&self.root, absolute)
            .or_else(|| relative_to(&self.given_root, absolute))
            .or_else(|| {
                // Some other symlinked spelling; the path itself may not exist yet
                let resolved = resolve_existing_prefix(absolute)?;
                relative_to(&self.root, &resolved)
            })
    }

    fn base_for_relative(&self) -> PathBuf {
        std::env::current_dir()
            .and_then(fs::canonicalize)
            .ok()
            .filter(|cwd| cwd.starts_with(&self.root))
            .unwrap_or_else(|| self.root.clone())
    }

    /// Re-reads the rules file and installs the result.
    ///
    /// Safe to call at any time, including when nothing changed.
    ///
    /// Once the manager is torn down this leaves the rules untouched and
    /// returns the current ones.
    pub fn reload(&self) -> Arc<RuleSet> {
        let _serial = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.torn_down.load(Ordering::Acquire) {
            debug!("Ignoring reload of {}: manager is shut down", self.root.display());
            return self.rules();
        }

        let rules = Arc::new(self.loader.load(&self.root));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&rules);

        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.reloaded.notify_all();

        info!(
            "Reloaded ignore rules for {} ({} patterns, generation {})",
            self.root.display(),
            rules.len(),
            *generation
        );
        rules
    }

    /// Handles one change event. Reloads (and returns true) only when the
    /// event names the rules file and the manager is still active.
    pub fn on_change(&self, event: &ChangeEvent) -> bool {
        if self.torn_down.load(Ordering::Acquire) || !self.is_rules_file(&event.path) {
            return false;
        }
        debug!("Rules file {:?}: {}", event.kind, event.path.display());
        self.reload();
        true
    }

    fn is_rules_file(&self, path: &Path) -> bool {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let Some(relative) = self.relative_to_root(&path) else {
            return false;
        };
        self.loader
            .config()
            .rules_file_candidates(&self.root)
            .iter()
            .filter_map(|candidate| relative_to(&self.root, candidate))
            .any(|candidate| candidate == relative)
    }

    /// The rule set currently in force.
    pub fn rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of completed reloads.
    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until at least `target` reloads have completed, or `timeout`
    /// passes. Returns whether the target was reached.
    pub fn wait_for_generation(&self, target: u64, timeout: Duration) -> bool {
        let guard = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .reloaded
            .wait_timeout_while(guard, timeout, |generation| *generation < target)
            .unwrap_or_else(PoisonError::into_inner);
        *guard >= target
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the rules file is, or would be created.
    pub fn rules_file(&self) -> PathBuf {
        self.loader.rules_file_path(&self.root)
    }

    pub fn config(&self) -> &IgnoreConfig {
        self.loader.config()
    }

    pub fn state(&self) -> ManagerState {
        if self.torn_down.load(Ordering::Acquire) {
            ManagerState::TornDown
        } else {
            ManagerState::Active
        }
    }

    /// Whether change events are currently being received.
    pub fn is_watching(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.watcher.is_running())
            .unwrap_or(false)
    }

    /// Stops the watcher and waits for the reload thread to finish.
    ///
    /// Idempotent. Also runs when the manager is dropped.
    pub fn shutdown(&self) {
        let was_active = !self.torn_down.swap(true, Ordering::AcqRel);

        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut subscription) = subscription {
            subscription.watcher.stop();
            if let Some(handle) = subscription.drain.take() {
                // The reload thread may itself drop the last handle
                if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                    warn!("Reload thread panicked");
                }
            }
        }

        if was_active {
            info!("Ignore manager for {} shut down", self.root.display());
        }
    }
}

impl Drop for IgnoreManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for IgnoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreManager")
            .field("root", &self.root)
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Makes `path` absolute and folds `.` and `..` without following links.
fn lexical_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Canonicalizes the deepest existing ancestor of `path` and re-appends
/// the part that doesn't exist yet.
fn resolve_existing_prefix(path: &Path) -> Option<PathBuf> {
    path.ancestors().find_map(|ancestor| {
        let resolved = fs::canonicalize(ancestor).ok()?;
        let rest = path.strip_prefix(ancestor).ok()?;
        Some(resolved.join(rest))
    })
}

fn has_trailing_separator(path: &Path) -> bool {
    let s = path.as_os_str().to_string_lossy();
    s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR)
}
