//! Page resolution for rendering.
//!
//! [`ContentReader::resolve`] merges stored rows with template defaults and
//! never fails: when the store cannot be read the template is served instead,
//! since marketing pages must stay up.

use std::sync::Arc;

use agency_store::{ContentStore, PageRecord, SectionFilter, SectionRecord, StoreError};
use agency_templates::{PageTemplate, SectionTemplate, SectionType, TemplateLibrary};
use serde::{Deserialize, Serialize};

use crate::notifier::{ChangeNotifier, ContentChange, Subscription};
use crate::page_cache::PageCache;
use crate::reconciler::{ReconcileError, Reconciler};

/// What [`ContentReader::resolve`] does for a path with a template but no
/// stored page row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPagePolicy {
    /// Seed the store from the template, then read it back.
    #[default]
    Materialize,
    /// Serve template data read-only; the store is left untouched.
    #[serde(alias = "template")]
    TemplateFallback,
}

/// Where a resolved page's content came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Store,
    Template,
}

/// One renderable section.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSection {
    pub section_key: String,
    pub title: String,
    pub content: String,
    pub section_type: SectionType,
    pub display_order: i32,
    pub metadata: serde_json::Value,
}

/// Effective content of a page: metadata plus active sections in order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPage {
    pub path: String,
    pub title: String,
    pub meta_title: String,
    pub meta_description: String,
    pub is_published: bool,
    pub sections: Vec<ResolvedSection>,
    pub source: ContentSource,
}

impl ResolvedPage {
    /// Read-only rendering of a template.
    #[must_use]
    pub fn from_template(template: &PageTemplate) -> Self {
        let mut sections: Vec<ResolvedSection> = template
            .sections
            .iter()
            .map(|section| ResolvedSection {
                section_key: section.section_key.clone(),
                title: section.title.clone(),
                content: section.content.clone(),
                section_type: section.section_type,
                display_order: section.display_order,
                metadata: section.metadata.clone(),
            })
            .collect();
        sections.sort_by_key(|section| section.display_order);

        Self {
            path: template.path.clone(),
            title: template.title.clone(),
            meta_title: template.meta_title.clone(),
            meta_description: template.meta_description.clone(),
            is_published: true,
            sections,
            source: ContentSource::Template,
        }
    }

    /// Merge stored rows over template defaults.
    ///
    /// A field set on the row wins, even when blank. Unset fields fall back to
    /// the template, then to empty. Only active sections are kept, stably
    /// sorted by `display_order`.
    #[must_use]
    pub fn from_records(
        page: PageRecord,
        sections: Vec<SectionRecord>,
        template: Option<&PageTemplate>,
    ) -> Self {
        let mut sections: Vec<SectionRecord> =
            sections.into_iter().filter(|section| section.is_active).collect();
        sections.sort_by_key(|section| section.display_order);

        let sections = sections
            .into_iter()
            .map(|section| {
                let fallback = template.and_then(|t| t.section(&section.section_key));
                resolve_section(section, fallback)
            })
            .collect();

        Self {
            title: page.title,
            meta_title: page
                .meta_title
                .or_else(|| template.map(|t| t.meta_title.clone()))
                .unwrap_or_default(),
            meta_description: page
                .meta_description
                .or_else(|| template.map(|t| t.meta_description.clone()))
                .unwrap_or_default(),
            is_published: page.is_published,
            path: page.page_path,
            sections,
            source: ContentSource::Store,
        }
    }

    #[must_use]
    pub fn section(&self, key: &str) -> Option<&ResolvedSection> {
        self.sections.iter().find(|s| s.section_key == key)
    }
}

fn resolve_section(section: SectionRecord, fallback: Option<&SectionTemplate>) -> ResolvedSection {
    let metadata = match section.metadata {
        serde_json::Value::Null => fallback.map_or_else(
            || serde_json::Value::Object(serde_json::Map::new()),
            |t| t.metadata.clone(),
        ),
        metadata => metadata,
    };
    ResolvedSection {
        title: section
            .title
            .or_else(|| fallback.map(|t| t.title.clone()))
            .unwrap_or_default(),
        content: section
            .content
            .or_else(|| fallback.map(|t| t.content.clone()))
            .unwrap_or_default(),
        section_key: section.section_key,
        section_type: section.section_type,
        display_order: section.display_order,
        metadata,
    }
}

/// Resolves page paths to renderable content, with a per-path cache.
///
/// Every cached path is watched through the [`ChangeNotifier`]; any change
/// notification for it evicts the entry. Cheap to clone; clones share the
/// cache.
#[derive(Clone)]
pub struct ContentReader {
    store: Arc<dyn ContentStore>,
    templates: Arc<TemplateLibrary>,
    reconciler: Reconciler,
    notifier: ChangeNotifier,
    cache: Arc<PageCache>,
    policy: MissingPagePolicy,
}

impl ContentReader {
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        templates: Arc<TemplateLibrary>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(Arc::clone(&store), Arc::clone(&templates)),
            store,
            templates,
            notifier,
            cache: Arc::new(PageCache::new()),
            policy: MissingPagePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MissingPagePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> MissingPagePolicy {
        self.policy
    }

    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Resolve `path` to its effective content.
    ///
    /// Returns `None` only when the path has neither a template nor a stored
    /// page. Store failures degrade to the template and are not cached.
    pub async fn resolve(&self, path: &str) -> Option<Arc<ResolvedPage>> {
        if let Some(page) = self.cache.get(path) {
            return Some(page);
        }

        let watched = self.watch_invalidations(path);
        let generation = self.cache.generation(path);

        match self.load(path).await {
            Ok(Some(page)) => {
                let page = Arc::new(page);
                if watched {
                    self.cache.insert(path, generation, Arc::clone(&page));
                }
                Some(page)
            }
            Ok(None) => {
                self.cache.unwatch(path);
                None
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Content store unavailable, serving template");
                let Some(template) = self.templates.get(path) else {
                    self.cache.unwatch(path);
                    return None;
                };
                Some(Arc::new(ResolvedPage::from_template(template)))
            }
        }
    }

    /// Drop the cached entry for `path`.
    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate(path);
    }

    /// Follow `path`: resolve now, then again after every change.
    ///
    /// # Errors
    ///
    /// Returns the store error if the change feed cannot be opened.
    pub async fn follow(&self, path: &str) -> Result<LivePage, StoreError> {
        let subscription = self.notifier.subscribe(path)?;
        let current = self.resolve(path).await;
        Ok(LivePage {
            reader: self.clone(),
            subscription,
            current,
        })
    }

    async fn load(&self, path: &str) -> Result<Option<ResolvedPage>, ReconcileError> {
        let template = self.templates.get(path);

        let mut record = self.read_page(path).await?;
        if record.is_none() {
            match (self.policy, template) {
                (MissingPagePolicy::Materialize, Some(_)) => {
                    self.reconciler.ensure_initialized(path).await?;
                    record = self.read_page(path).await?;
                }
                (MissingPagePolicy::TemplateFallback, Some(template)) => {
                    return Ok(Some(ResolvedPage::from_template(template)));
                }
                (_, None) => return Ok(None),
            }
        }
        let Some(record) = record else {
            return Ok(template.map(ResolvedPage::from_template));
        };

        let sections = self
            .store
            .sections(path, SectionFilter::Active)
            .await
            .map_err(|source| ReconcileError::Read {
                path: path.to_owned(),
                source,
            })?;
        Ok(Some(ResolvedPage::from_records(record, sections, template)))
    }

    async fn read_page(&self, path: &str) -> Result<Option<PageRecord>, ReconcileError> {
        self.store
            .page(path)
            .await
            .map_err(|source| ReconcileError::Read {
                path: path.to_owned(),
                source,
            })
    }

    /// Make sure a change to `path` evicts its cache entry.
    ///
    /// Returns `false` if the path cannot be watched; its page must then not
    /// be cached.
    fn watch_invalidations(&self, path: &str) -> bool {
        if self.cache.is_watched(path) {
            return true;
        }
        let mut subscription = match self.notifier.subscribe(path) {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(path, error = %e, "Cannot watch page, caching disabled for it");
                return false;
            }
        };

        let cache = Arc::downgrade(&self.cache);
        let key = path.to_owned();
        let task = tokio::spawn(async move {
            while subscription.changed().await.is_some() {
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.invalidate(&key);
            }
        });
        self.cache.set_watcher(path, task);
        true
    }
}

/// A page kept current by change notifications.
pub struct LivePage {
    reader: ContentReader,
    subscription: Subscription,
    current: Option<Arc<ResolvedPage>>,
}

impl LivePage {
    /// Latest resolved content.
    #[must_use]
    pub fn current(&self) -> Option<&ResolvedPage> {
        self.current.as_deref()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.subscription.path()
    }

    /// Wait for the next change and re-resolve.
    ///
    /// Notifications carry no data, so a duplicate only re-reads the same
    /// state. Returns `None` when the subscription is closed.
    pub async fn refresh(&mut self) -> Option<ContentChange> {
        let change = self.subscription.changed().await?;
        self.reader.invalidate(self.subscription.path());
        self.current = self.reader.resolve(self.subscription.path()).await;
        Some(change)
    }
}

impl std::fmt::Debug for LivePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePage")
            .field("path", &self.path())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agency_store::{MockStore, PagePatch, SectionPatch};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const WAIT: Duration = Duration::from_secs(1);

    fn about() -> PageTemplate {
        PageTemplate::new("/about", "About Us")
            .meta("About | Agency", "Who we are")
            .with_section(
                SectionTemplate::new("team", SectionType::Team, 2)
                    .title("Our people")
                    .metadata(json!({"members": []})),
            )
            .with_section(
                SectionTemplate::new("hero", SectionType::Hero, 1)
                    .title("Meet the team")
                    .content("We grow brands."),
            )
    }

    fn seeded() -> Arc<MockStore> {
        let template = about();
        let mut store = MockStore::new().with_page(PageRecord::from_template(&template));
        for section in &template.sections {
            store = store.with_section(SectionRecord::from_template("/about", section));
        }
        Arc::new(store)
    }

    fn reader(store: &Arc<MockStore>) -> ContentReader {
        let templates = Arc::new(TemplateLibrary::new(vec![about()]).unwrap());
        let shared = Arc::clone(store) as Arc<dyn ContentStore>;
        let notifier = ChangeNotifier::new(Arc::clone(&shared));
        ContentReader::new(shared, templates, notifier)
    }

    fn keys(page: &ResolvedPage) -> Vec<&str> {
        page.sections.iter().map(|s| s.section_key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_resolve_materializes_missing_page() {
        let store = Arc::new(MockStore::new());
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.source, ContentSource::Store);
        assert_eq!(page.title, "About Us");
        assert_eq!(keys(&page), vec!["hero", "team"]);
        assert_eq!(store.page_rows("/about"), 1);
        assert_eq!(store.section_rows("/about"), 2);
    }

    #[tokio::test]
    async fn test_resolve_template_fallback_policy_is_read_only() {
        let store = Arc::new(MockStore::new());
        let reader = reader(&store).with_policy(MissingPagePolicy::TemplateFallback);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.source, ContentSource::Template);
        assert_eq!(keys(&page), vec!["hero", "team"]);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_resolve_unknown_path() {
        let store = Arc::new(MockStore::new());
        let reader = reader(&store);

        assert!(reader.resolve("/blog/some-post").await.is_none());
        assert_eq!(store.writes(), 0);
        tokio::time::timeout(WAIT, async {
            while store.watcher_count("/blog/some-post") > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_unknown_path_with_failing_store_releases_watch() {
        let store = Arc::new(MockStore::new().fail_reads_for("/random-1"));
        let reader = reader(&store);

        assert!(reader.resolve("/random-1").await.is_none());

        tokio::time::timeout(WAIT, async {
            while store.watcher_count("/random-1") > 0
                || !reader.notifier().active_paths().is_empty()
            {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(reader.cache().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_stored_page_without_template() {
        let store = Arc::new(MockStore::new().with_page(PageRecord {
            page_path: "/landing".to_owned(),
            title: "Landing".to_owned(),
            meta_title: None,
            meta_description: None,
            is_published: false,
        }));
        let reader = reader(&store);

        let page = reader.resolve("/landing").await.unwrap();

        assert_eq!(page.title, "Landing");
        assert_eq!(page.meta_title, "");
        assert!(!page.is_published);
        assert!(page.sections.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_store_failure_serves_template() {
        let store = Arc::new(MockStore::new().fail_reads_for("/about"));
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.source, ContentSource::Template);
        assert_eq!(page.title, "About Us");
        assert!(reader.cache().get("/about").is_none());
    }

    #[tokio::test]
    async fn test_resolve_write_failure_serves_template() {
        let store = Arc::new(MockStore::new().fail_writes_for("/about"));
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.source, ContentSource::Template);
        assert!(reader.cache().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_uses_row_values_over_template() {
        let template = about();
        let mut page = PageRecord::from_template(&template);
        page.title = "Custom Title".to_owned();
        page.meta_title = Some(String::new());
        page.meta_description = None;
        let mut hero = SectionRecord::from_template("/about", &template.sections[1]);
        hero.title = None;
        hero.content = Some(String::new());
        let store = Arc::new(MockStore::new().with_page(page).with_section(hero));
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.title, "Custom Title");
        assert_eq!(page.meta_title, "");
        assert_eq!(page.meta_description, "Who we are");
        let hero = page.section("hero").unwrap();
        assert_eq!(hero.title, "Meet the team");
        assert_eq!(hero.content, "");
        // Materialized pages show stored sections only.
        assert_eq!(keys(&page), vec!["hero"]);
    }

    #[tokio::test]
    async fn test_resolve_orders_active_sections() {
        let template = about();
        let section = |key: &str, order: i32, active: bool| SectionRecord {
            page_path: "/about".to_owned(),
            section_key: key.to_owned(),
            title: Some(key.to_owned()),
            content: None,
            section_type: SectionType::Text,
            display_order: order,
            metadata: json!({}),
            is_active: active,
        };
        let store = Arc::new(
            MockStore::new()
                .with_page(PageRecord::from_template(&template))
                .with_section(section("c", 3, true))
                .with_section(section("a", 1, true))
                .with_section(section("hidden", 0, false))
                .with_section(section("b", 1, true)),
        );
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(keys(&page), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_resolve_null_metadata_falls_back() {
        let template = about();
        let mut team = SectionRecord::from_template("/about", &template.sections[0]);
        team.metadata = serde_json::Value::Null;
        let mut extra = SectionRecord::from_template("/about", &template.sections[0]);
        extra.section_key = "extra".to_owned();
        extra.metadata = serde_json::Value::Null;
        let store = Arc::new(
            MockStore::new()
                .with_page(PageRecord::from_template(&template))
                .with_section(team)
                .with_section(extra),
        );
        let reader = reader(&store);

        let page = reader.resolve("/about").await.unwrap();

        assert_eq!(page.section("team").unwrap().metadata, json!({"members": []}));
        assert_eq!(page.section("extra").unwrap().metadata, json!({}));
    }

    #[tokio::test]
    async fn test_resolve_caches_until_invalidated() {
        let store = seeded();
        let reader = reader(&store);
        let first = reader.resolve("/about").await.unwrap();

        let patch = PagePatch {
            title: Some("Changed".to_owned()),
            ..PagePatch::default()
        };
        store.set_unavailable(true);
        let cached = reader.resolve("/about").await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        store.set_unavailable(false);

        store.update_page("/about", &patch).await.unwrap();
        reader.invalidate("/about");

        assert_eq!(reader.resolve("/about").await.unwrap().title, "Changed");
    }

    #[tokio::test]
    async fn test_store_change_evicts_cache_entry() {
        let store = seeded();
        let reader = reader(&store);
        reader.resolve("/about").await.unwrap();
        assert_eq!(reader.cache().len(), 1);

        store
            .update_section("/about", "hero", &SectionPatch::active(false))
            .await
            .unwrap();

        tokio::time::timeout(WAIT, async {
            while reader.cache().get("/about").is_some() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(keys(&reader.resolve("/about").await.unwrap()), vec!["team"]);
    }

    #[tokio::test]
    async fn test_live_page_refreshes_on_change() {
        let store = seeded();
        let reader = reader(&store);
        let mut live = reader.follow("/about").await.unwrap();
        assert_eq!(live.current().unwrap().title, "About Us");

        let patch = PagePatch {
            title: Some("Who We Are".to_owned()),
            ..PagePatch::default()
        };
        store.update_page("/about", &patch).await.unwrap();
        reader.notifier().notify_local("/about");

        tokio::time::timeout(WAIT, live.refresh()).await.unwrap().unwrap();
        let once = live.current().cloned();
        tokio::time::timeout(WAIT, live.refresh()).await.unwrap().unwrap();

        assert_eq!(live.current().unwrap().title, "Who We Are");
        assert_eq!(live.current().cloned(), once);
    }

    #[test]
    fn test_missing_page_policy_deserializes() {
        let policy: MissingPagePolicy = serde_json::from_str("\"template\"").unwrap();
        assert_eq!(policy, MissingPagePolicy::TemplateFallback);
        let policy: MissingPagePolicy = serde_json::from_str("\"materialize\"").unwrap();
        assert_eq!(policy, MissingPagePolicy::Materialize);
    }
}
