//! Build-once coordination: at most one concurrent index build per source
//! path, plus progress reporting for builds in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

/// Progress snapshot for one in-flight build.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Local filesystem path of the source file being indexed.
    pub file_path: String,
    /// Source file size in bytes.
    pub file_size: i64,
    /// Percent complete, 0..=100.
    pub progress: i32,
}

#[derive(Default)]
struct Registry {
    map: HashMap<PathBuf, ProgressInfo>,
    keys: Vec<PathBuf>,
}

/// Process-wide build coordinator. One instance is shared across all
/// request handlers.
pub struct Coordinator {
    registry: Mutex<Registry>,
    poll_interval: Duration,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Creates a coordinator with the default 10ms spin-wait backoff.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Attempts to register `path` as an in-flight build. Returns `true` if
    /// another build already holds it (the caller must wait), `false` if
    /// this call took ownership.
    fn start(&self, path: &Path, file_size: i64) -> bool {
        let mut registry = self.registry.lock();
        if registry.map.contains_key(path) {
            return true;
        }
        registry.map.insert(
            path.to_path_buf(),
            ProgressInfo {
                file_path: path.display().to_string(),
                file_size,
                progress: 0,
            },
        );
        registry.keys.push(path.to_path_buf());
        false
    }

    /// Removes `path` from the in-flight set.
    fn finish(&self, path: &Path) {
        let mut registry = self.registry.lock();
        registry.map.remove(path);
        registry.keys.retain(|k| k != path);
    }

    /// Updates the progress of an in-flight build, if strictly increasing.
    pub fn update(&self, path: &Path, cur_offset: u64, total: u64) {
        if total == 0 {
            return;
        }
        let progress = ((cur_offset * 100) / total) as i32;
        let mut registry = self.registry.lock();
        if let Some(info) = registry.map.get_mut(path) {
            if progress > info.progress {
                info.progress = progress;
            }
        }
    }

    /// Snapshot of all builds currently in flight, in the order they were
    /// started.
    pub fn progress(&self) -> Vec<ProgressInfo> {
        let registry = self.registry.lock();
        registry
            .keys
            .iter()
            .filter_map(|k| registry.map.get(k).cloned())
            .collect()
    }

    /// Runs `build` with mutual exclusion on `path`: if another build for
    /// the same path is already in flight, spins until it finishes, then
    /// lets `should_skip` decide whether the result that build produced
    /// makes a fresh build unnecessary.
    pub fn run_exclusive<T>(
        &self,
        path: &Path,
        file_size: i64,
        mut should_skip: impl FnMut() -> Option<T>,
        build: impl FnOnce(&Coordinator) -> T,
    ) -> T {
        let mut waited = false;
        while self.start(path, file_size) {
            waited = true;
            std::thread::sleep(self.poll_interval);
        }

        if waited {
            if let Some(existing) = should_skip() {
                self.finish(path);
                return existing;
            }
        }

        debug!(path = %path.display(), "starting exclusive build");
        let result = build(self);
        self.finish(path);
        result
    }
}
