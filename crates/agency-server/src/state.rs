//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use agency_content::{ChangeNotifier, ContentEditor, ContentReader, MissingPagePolicy, Reconciler};
use agency_store::ContentStore;
use agency_templates::TemplateLibrary;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Content store backend.
    pub(crate) store: Arc<dyn ContentStore>,
    /// Template-driven initialization.
    pub(crate) reconciler: Reconciler,
    /// Cached page resolution.
    pub(crate) reader: ContentReader,
    /// Editor write path.
    pub(crate) editor: ContentEditor,
    /// Serve `/ws/content`.
    pub(crate) live_updates: bool,
    /// Application version for cache invalidation.
    pub(crate) version: String,
}

impl AppState {
    /// Wire the content services over one store and template library.
    pub(crate) fn new(
        store: Arc<dyn ContentStore>,
        templates: Arc<TemplateLibrary>,
        policy: MissingPagePolicy,
        live_updates: bool,
        version: String,
    ) -> Self {
        let notifier = ChangeNotifier::new(Arc::clone(&store));
        let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&templates));
        let reader =
            ContentReader::new(Arc::clone(&store), templates, notifier).with_policy(policy);
        let editor = ContentEditor::new(Arc::clone(&store), reader.clone());
        Self {
            store,
            reconciler,
            reader,
            editor,
            live_updates,
            version,
        }
    }

    pub(crate) fn notifier(&self) -> &ChangeNotifier {
        self.reader.notifier()
    }
}
