//! In-memory cache of resolved pages.
//!
//! Entries are keyed by page path and dropped by [`PageCache::invalidate`].
//! Each path carries a generation counter so a resolve that raced with an
//! invalidation cannot store the stale page it read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::reader::ResolvedPage;

#[derive(Default)]
struct CacheState {
    pages: HashMap<String, Arc<ResolvedPage>>,
    generations: HashMap<String, u64>,
    watchers: HashMap<String, JoinHandle<()>>,
}

/// Resolved pages keyed by path.
///
/// Owned by a [`ContentReader`](crate::ContentReader); invalidation tasks
/// registered through [`set_watcher`](Self::set_watcher) are aborted when the
/// cache is dropped.
#[derive(Default)]
pub struct PageCache {
    state: Mutex<CacheState>,
}

impl PageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached page for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<ResolvedPage>> {
        self.lock().pages.get(path).cloned()
    }

    /// Drop the entry for `path`.
    pub fn invalidate(&self, path: &str) {
        let mut state = self.lock();
        state.pages.remove(path);
        *state.generations.entry(path.to_owned()).or_default() += 1;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        let paths: Vec<String> = state.pages.drain().map(|(path, _)| path).collect();
        for path in paths {
            *state.generations.entry(path).or_default() += 1;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().pages.is_empty()
    }

    /// Current generation of `path`; pass it back to [`insert`](Self::insert).
    pub(crate) fn generation(&self, path: &str) -> u64 {
        self.lock().generations.get(path).copied().unwrap_or(0)
    }

    /// Store `page` unless `path` was invalidated since `generation` was read.
    pub(crate) fn insert(&self, path: &str, generation: u64, page: Arc<ResolvedPage>) -> bool {
        let mut state = self.lock();
        if state.generations.get(path).copied().unwrap_or(0) != generation {
            return false;
        }
        state.pages.insert(path.to_owned(), page);
        true
    }

    pub(crate) fn is_watched(&self, path: &str) -> bool {
        self.lock()
            .watchers
            .get(path)
            .is_some_and(|task| !task.is_finished())
    }

    pub(crate) fn set_watcher(&self, path: &str, task: JoinHandle<()>) {
        if let Some(previous) = self.lock().watchers.insert(path.to_owned(), task) {
            previous.abort();
        }
    }

    pub(crate) fn unwatch(&self, path: &str) {
        if let Some(task) = self.lock().watchers.remove(path) {
            task.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PageCache {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in state.watchers.drain() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
