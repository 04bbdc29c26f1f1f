//! Per-path change notification.
//!
//! Merges two sources into one "page changed" stream per path: the store's
//! native change feed and edits made in this process. The first subscriber
//! for a path opens the store feed; the last one to drop releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use agency_store::{
    ContentStore, StoreError, StoreEvent, StoreEventKind, StoreEventReceiver, Table, WatchHandle,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Broadcast buffer per path. Lagging subscribers skip ahead; a change
/// carries no data, so missing one only merges refreshes.
const CHANNEL_CAPACITY: usize = 64;

/// Where a change notification came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// An edit made through this process.
    Local,
    /// A committed row change reported by the store.
    Store { table: Table, kind: StoreEventKind },
}

/// "Content at `path` changed; re-resolve it."
///
/// Carries no diff. The same write may be announced twice (once locally,
/// once echoed by the store), so consumers must refresh idempotently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentChange {
    pub path: String,
    pub origin: ChangeOrigin,
}

impl ContentChange {
    #[must_use]
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            origin: ChangeOrigin::Local,
        }
    }
}

impl From<StoreEvent> for ContentChange {
    fn from(event: StoreEvent) -> Self {
        Self {
            path: event.page_path,
            origin: ChangeOrigin::Store {
                table: event.table,
                kind: event.kind,
            },
        }
    }
}

/// Shared state for one subscribed path.
///
/// Dropping it stops the forwarding task and the store watch.
struct Channel {
    sender: broadcast::Sender<ContentChange>,
    subscribers: usize,
    pump: JoinHandle<()>,
    _watch: WatchHandle,
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

type Registry = Mutex<HashMap<String, Channel>>;

/// Per-path publish/subscribe over store changes and local edits.
///
/// Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct ChangeNotifier {
    store: Arc<dyn ContentStore>,
    channels: Arc<Registry>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to changes of one page path.
    ///
    /// Must be called from within a tokio runtime: the first subscriber for
    /// a path spawns the task forwarding store events.
    ///
    /// # Errors
    ///
    /// Returns the store error if the store refuses to open a change feed.
    pub fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let mut channels = self.lock();

        let receiver = if let Some(channel) = channels.get_mut(path) {
            channel.subscribers += 1;
            channel.sender.subscribe()
        } else {
            let (events, watch) = self.store.watch(path)?;
            let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
            let pump = tokio::spawn(forward(path.to_owned(), events, sender.clone()));
            channels.insert(
                path.to_owned(),
                Channel {
                    sender,
                    subscribers: 1,
                    pump,
                    _watch: watch,
                },
            );
            tracing::debug!(path, "Opened store change feed");
            receiver
        };

        Ok(Subscription {
            path: path.to_owned(),
            receiver,
            registry: Arc::downgrade(&self.channels),
        })
    }

    /// Announce an edit made in this process.
    ///
    /// Delivered immediately, without waiting for the store to echo the
    /// write. Returns the number of subscribers reached.
    pub fn notify_local(&self, path: &str) -> usize {
        let channels = self.lock();
        channels
            .get(path)
            .and_then(|channel| channel.sender.send(ContentChange::local(path)).ok())
            .unwrap_or(0)
    }

    /// Paths with at least one live subscription.
    #[must_use]
    pub fn active_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.lock().get(path).map_or(0, |channel| channel.subscribers)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Channel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn forward(
    path: String,
    mut events: StoreEventReceiver,
    sender: broadcast::Sender<ContentChange>,
) {
    while let Some(event) = events.recv().await {
        // No receivers only means every subscriber is mid-drop.
        let _ = sender.send(ContentChange::from(event));
    }
    tracing::debug!(path, "Store change feed closed");
}

/// A live subscription to one path. Dropping it unsubscribes.
pub struct Subscription {
    path: String,
    receiver: broadcast::Receiver<ContentChange>,
    registry: Weak<Registry>,
}

impl Subscription {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the notifier has shut the path down.
    pub async fn changed(&mut self) -> Option<ContentChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        path = %self.path,
                        skipped,
                        "Subscriber lagged, coalescing changes"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take a pending change without waiting.
    pub fn try_changed(&mut self) -> Option<ContentChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let released = {
            let mut channels = registry.lock().unwrap_or_else(PoisonError::into_inner);
            match channels.get_mut(&self.path) {
                Some(channel) if channel.subscribers > 1 => {
                    channel.subscribers -= 1;
                    None
                }
                Some(_) => channels.remove(&self.path),
                None => None,
            }
        };
        if let Some(channel) = released {
            drop(channel);
            tracing::debug!(path = %self.path, "Released store change feed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agency_store::{MockStore, PagePatch, PageRecord, StoreErrorKind};
    use pretty_assertions::assert_eq;

    use super::*;

    const WAIT: Duration = Duration::from_secs(1);

    fn page(path: &str) -> PageRecord {
        PageRecord {
            page_path: path.to_owned(),
            title: "Title".to_owned(),
            meta_title: None,
            meta_description: None,
            is_published: true,
        }
    }

    fn notifier() -> (Arc<MockStore>, ChangeNotifier) {
        let store = Arc::new(MockStore::new().with_page(page("/about")));
        let notifier = ChangeNotifier::new(Arc::clone(&store) as Arc<dyn ContentStore>);
        (store, notifier)
    }

    async fn next(subscription: &mut Subscription) -> ContentChange {
        tokio::time::timeout(WAIT, subscription.changed())
            .await
            .expect("timed out waiting for change")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_local_edit_reaches_subscriber() {
        let (_store, notifier) = notifier();
        let mut subscription = notifier.subscribe("/about").unwrap();

        assert_eq!(notifier.notify_local("/about"), 1);

        assert_eq!(next(&mut subscription).await, ContentChange::local("/about"));
    }

    #[tokio::test]
    async fn test_store_write_reaches_subscriber() {
        let (store, notifier) = notifier();
        let mut subscription = notifier.subscribe("/about").unwrap();

        let patch = PagePatch {
            title: Some("New".to_owned()),
            ..PagePatch::default()
        };
        store.update_page("/about", &patch).await.unwrap();

        let change = next(&mut subscription).await;
        assert_eq!(change.path, "/about");
        assert_eq!(
            change.origin,
            ChangeOrigin::Store {
                table: Table::PageContent,
                kind: StoreEventKind::Updated
            }
        );
    }

    #[tokio::test]
    async fn test_changes_are_scoped_to_path() {
        let (store, notifier) = notifier();
        let mut about = notifier.subscribe("/about").unwrap();
        let mut faq = notifier.subscribe("/faq").unwrap();

        store.emit(&StoreEvent::new(Table::PageSections, "/faq", StoreEventKind::Inserted));
        notifier.notify_local("/faq");

        assert_eq!(next(&mut faq).await.path, "/faq");
        assert_eq!(next(&mut faq).await.path, "/faq");
        tokio::task::yield_now().await;
        assert_eq!(about.try_changed(), None);
    }

    #[tokio::test]
    async fn test_local_edit_and_store_echo_both_delivered() {
        let (store, notifier) = notifier();
        let mut subscription = notifier.subscribe("/about").unwrap();

        notifier.notify_local("/about");
        store.emit(&StoreEvent::new(Table::PageContent, "/about", StoreEventKind::Updated));

        let first = next(&mut subscription).await;
        let second = next(&mut subscription).await;
        assert_eq!(first.origin, ChangeOrigin::Local);
        assert!(matches!(second.origin, ChangeOrigin::Store { .. }));
    }

    #[tokio::test]
    async fn test_subscribers_share_one_store_feed() {
        let (store, notifier) = notifier();
        let mut first = notifier.subscribe("/about").unwrap();
        let mut second = notifier.subscribe("/about").unwrap();

        assert_eq!(store.watcher_count("/about"), 1);
        assert_eq!(notifier.subscriber_count("/about"), 2);

        notifier.notify_local("/about");
        assert_eq!(next(&mut first).await.path, "/about");
        assert_eq!(next(&mut second).await.path, "/about");
    }

    #[tokio::test]
    async fn test_last_unsubscribe_releases_store_feed() {
        let (store, notifier) = notifier();
        let first = notifier.subscribe("/about").unwrap();
        let second = notifier.subscribe("/about").unwrap();

        drop(first);
        assert_eq!(store.watcher_count("/about"), 1);
        assert_eq!(notifier.active_paths(), vec!["/about".to_owned()]);

        drop(second);
        assert_eq!(store.watcher_count("/about"), 0);
        assert_eq!(notifier.subscriber_count("/about"), 0);
        assert!(notifier.active_paths().is_empty());
        assert_eq!(notifier.notify_local("/about"), 0);
    }

    #[tokio::test]
    async fn test_resubscribe_after_release_opens_new_feed() {
        let (store, notifier) = notifier();
        drop(notifier.subscribe("/about").unwrap());

        let mut subscription = notifier.subscribe("/about").unwrap();
        assert_eq!(store.watcher_count("/about"), 1);

        store.emit(&StoreEvent::new(Table::PageContent, "/about", StoreEventKind::Updated));
        assert_eq!(next(&mut subscription).await.path, "/about");
    }

    #[tokio::test]
    async fn test_subscription_outliving_notifier() {
        let (store, notifier) = notifier();
        let subscription = notifier.subscribe("/about").unwrap();

        drop(notifier);
        drop(subscription);

        tokio::task::yield_now().await;
        assert_eq!(store.watcher_count("/about"), 0);
    }

    #[tokio::test]
    async fn test_subscribe_fails_when_store_unavailable() {
        let (store, notifier) = notifier();
        store.set_unavailable(true);

        let err = notifier.subscribe("/about").unwrap_err();

        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        assert!(notifier.active_paths().is_empty());
    }

    #[test]
    fn test_change_serializes_with_origin() {
        let change = ContentChange::from(StoreEvent::new(
            Table::PageSections,
            "/faq",
            StoreEventKind::Deleted,
        ));

        let json = serde_json::to_value(&change).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "path": "/faq",
                "origin": {"source": "store", "table": "page_sections", "kind": "deleted"}
            })
        );
        assert_eq!(
            serde_json::to_value(ContentChange::local("/")).unwrap(),
            serde_json::json!({"path": "/", "origin": {"source": "local"}})
        );
    }
}
