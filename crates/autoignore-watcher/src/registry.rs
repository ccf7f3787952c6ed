//! Per-root manager registry.
//!
//! Each project root gets at most one [`IgnoreManager`] per registry. The
//! first `get_instance` for a root builds it, later calls hand out the same
//! instance, and `reset_instance` tears it down so the next call starts
//! fresh. Roots are keyed by their canonical path, so `.` and the absolute
//! spelling of the same directory share an instance.

use crate::error::Result;
use crate::manager::IgnoreManager;
use crate::watcher::{ChangeWatcher, FileWatcher};
use autoignore_core::{IgnoreConfig, IgnoreError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

type WatcherFactory = Box<dyn Fn() -> Box<dyn ChangeWatcher> + Send + Sync>;

/// Hands out one [`IgnoreManager`] per project root.
pub struct IgnoreRegistry {
    config: IgnoreConfig,
    watcher_factory: WatcherFactory,
    instances: Mutex<HashMap<PathBuf, Arc<IgnoreManager>>>,
}

impl IgnoreRegistry {
    /// A registry whose managers watch their rules file with a
    /// [`FileWatcher`] (unless `config.watch` is off).
    pub fn new(config: IgnoreConfig) -> Self {
        Self::with_watcher_factory(config, || -> Box<dyn ChangeWatcher> {
            Box::new(FileWatcher::new())
        })
    }

    /// A registry that builds each manager's watcher with `factory`.
    pub fn with_watcher_factory<F>(config: IgnoreConfig, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ChangeWatcher> + Send + Sync + 'static,
    {
        Self {
            config,
            watcher_factory: Box::new(factory),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry, using the default configuration.
    pub fn global() -> &'static IgnoreRegistry {
        static GLOBAL: OnceLock<IgnoreRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| IgnoreRegistry::new(IgnoreConfig::default()))
    }

    /// Returns the manager for `root`, creating it on first use.
    pub fn get_instance(&self, root: &Path) -> Result<Arc<IgnoreManager>> {
        let key = fs::canonicalize(root).map_err(|e| IgnoreError::io(root, e))?;
        let mut instances = self.lock();

        if let Some(manager) = instances.get(&key) {
            return Ok(Arc::clone(manager));
        }

        let manager = if self.config.watch {
            IgnoreManager::with_watcher(root, self.config.clone(), (self.watcher_factory)())?
        } else {
            IgnoreManager::new(root, self.config.clone())?
        };

        debug!("Created ignore manager for {}", key.display());
        instances.insert(key, Arc::clone(&manager));
        Ok(manager)
    }

    /// The manager for `root`, if one exists. Never creates one.
    pub fn instance(&self, root: &Path) -> Option<Arc<IgnoreManager>> {
        let key = fs::canonicalize(root).ok()?;
        self.lock().get(&key).cloned()
    }

    /// Tears down the manager for `root` and forgets it.
    ///
    /// Returns whether there was one. Handles still held elsewhere keep
    /// answering queries from their last rules but no longer reload.
    pub fn reset_instance(&self, root: &Path) -> bool {
        let key = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let removed = self.lock().remove(&key);
        match removed {
            Some(manager) => {
                manager.shutdown();
                true
            }
            None => false,
        }
    }

    /// Tears down every manager. Returns how many there were.
    pub fn reset_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().map(|(_, m)| m).collect();
        for manager in &drained {
            manager.shutdown();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn config(&self) -> &IgnoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<IgnoreManager>>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for IgnoreRegistry {
    fn drop(&mut self) {
        self.reset_all();
    }
}
