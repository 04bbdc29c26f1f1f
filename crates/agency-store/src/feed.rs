//! In-process change feed shared by store backends.
//!
//! Backends call [`ChangeFeed::publish`] after a write commits. Watchers are
//! registered per page path and unregistered when their [`WatchHandle`] drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use crate::event::{StoreEvent, StoreEventReceiver, WatchHandle};

type Sender = mpsc::UnboundedSender<StoreEvent>;

#[derive(Default)]
struct Watchers {
    next_id: u64,
    by_path: HashMap<String, Vec<(u64, Sender)>>,
}

impl Watchers {
    fn remove(&mut self, path: &str, id: u64) {
        if let Some(senders) = self.by_path.get_mut(path) {
            senders.retain(|(watcher_id, _)| *watcher_id != id);
            if senders.is_empty() {
                self.by_path.remove(path);
            }
        }
    }
}

/// Fan-out of committed row changes to per-path watchers.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    watchers: Arc<Mutex<Watchers>>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher for one page path.
    pub fn watch(&self, path: &str) -> (StoreEventReceiver, WatchHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut watchers = self.lock();
            let id = watchers.next_id;
            watchers.next_id += 1;
            watchers
                .by_path
                .entry(path.to_owned())
                .or_default()
                .push((id, tx));
            id
        };

        let weak: Weak<Mutex<Watchers>> = Arc::downgrade(&self.watchers);
        let path = path.to_owned();
        let handle = WatchHandle::new(move || {
            if let Some(watchers) = weak.upgrade() {
                watchers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&path, id);
            }
        });

        (StoreEventReceiver::new(rx), handle)
    }

    /// Deliver an event to every watcher of its page path.
    ///
    /// Watchers whose receiver has been dropped are pruned.
    pub fn publish(&self, event: &StoreEvent) {
        let mut watchers = self.lock();
        let Some(senders) = watchers.by_path.get_mut(&event.page_path) else {
            return;
        };
        senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        if senders.is_empty() {
            watchers.by_path.remove(&event.page_path);
        }
    }

    /// Number of live watchers for a path.
    #[must_use]
    pub fn watcher_count(&self, path: &str) -> usize {
        self.lock().by_path.get(path).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Watchers> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths = self.lock().by_path.len();
        f.debug_struct("ChangeFeed").field("paths", &paths).finish()
    }
}
