//! Row types for the page-content and page-sections tables.

use std::fmt;
use std::str::FromStr;

use agency_templates::{PageTemplate, SectionTemplate, SectionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted page row, keyed by `page_path`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Route path (unique).
    pub page_path: String,
    /// Display title.
    pub title: String,
    /// SEO title. `None` when never set.
    pub meta_title: Option<String>,
    /// SEO description. `None` when never set.
    pub meta_description: Option<String>,
    /// Whether the page is visible to the public.
    pub is_published: bool,
}

impl PageRecord {
    /// Seed a published page row from its template.
    #[must_use]
    pub fn from_template(template: &PageTemplate) -> Self {
        Self {
            page_path: template.path.clone(),
            title: template.title.clone(),
            meta_title: Some(template.meta_title.clone()),
            meta_description: Some(template.meta_description.clone()),
            is_published: true,
        }
    }
}

/// Persisted section row, keyed by `(page_path, section_key)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    /// Owning page path.
    pub page_path: String,
    /// Section identifier within the page.
    pub section_key: String,
    /// Heading. `None` when never set.
    pub title: Option<String>,
    /// Body text. `None` when never set.
    pub content: Option<String>,
    /// Kind of block.
    pub section_type: SectionType,
    /// Rendering position among siblings.
    pub display_order: i32,
    /// Structured extras.
    pub metadata: serde_json::Value,
    /// `false` hides the section without removing the row.
    pub is_active: bool,
}

impl SectionRecord {
    /// Seed an active section row from its template.
    #[must_use]
    pub fn from_template(page_path: &str, template: &SectionTemplate) -> Self {
        Self {
            page_path: page_path.to_owned(),
            section_key: template.section_key.clone(),
            title: Some(template.title.clone()),
            content: Some(template.content.clone()),
            section_type: template.section_type,
            display_order: template.display_order,
            metadata: template.metadata.clone(),
            is_active: true,
        }
    }
}

/// Which section rows a query returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SectionFilter {
    /// Only rows with `is_active = true`.
    #[default]
    Active,
    /// Active and soft-deleted rows.
    All,
}

impl SectionFilter {
    /// Whether the filter admits the row.
    #[must_use]
    pub fn matches(self, section: &SectionRecord) -> bool {
        match self {
            Self::Active => section.is_active,
            Self::All => true,
        }
    }
}

/// Partial update of a page row. `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagePatch {
    pub title: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
}

impl PagePatch {
    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.is_published.is_none()
    }

    /// Apply the patch in place.
    pub fn apply(&self, page: &mut PageRecord) {
        if let Some(title) = &self.title {
            page.title.clone_from(title);
        }
        if let Some(meta_title) = &self.meta_title {
            page.meta_title = Some(meta_title.clone());
        }
        if let Some(meta_description) = &self.meta_description {
            page.meta_description = Some(meta_description.clone());
        }
        if let Some(is_published) = self.is_published {
            page.is_published = is_published;
        }
    }
}

/// Partial update of a section row. `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub section_type: Option<SectionType>,
    pub display_order: Option<i32>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl SectionPatch {
    /// Patch that only toggles `is_active`.
    #[must_use]
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.section_type.is_none()
            && self.display_order.is_none()
            && self.metadata.is_none()
            && self.is_active.is_none()
    }

    /// Apply the patch in place.
    pub fn apply(&self, section: &mut SectionRecord) {
        if let Some(title) = &self.title {
            section.title = Some(title.clone());
        }
        if let Some(content) = &self.content {
            section.content = Some(content.clone());
        }
        if let Some(section_type) = self.section_type {
            section.section_type = section_type;
        }
        if let Some(display_order) = self.display_order {
            section.display_order = display_order;
        }
        if let Some(metadata) = &self.metadata {
            section.metadata = metadata.clone();
        }
        if let Some(is_active) = self.is_active {
            section.is_active = is_active;
        }
    }
}

/// Kind of change recorded in the activity log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    SeededPage,
    SeededSection,
    UpdatedPage,
    UpdatedSection,
    DeactivatedSection,
    RestoredSection,
}

impl ActivityAction {
    const ALL: [Self; 6] = [
        Self::SeededPage,
        Self::SeededSection,
        Self::UpdatedPage,
        Self::UpdatedSection,
        Self::DeactivatedSection,
        Self::RestoredSection,
    ];

    /// Stored string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeededPage => "seeded_page",
            Self::SeededSection => "seeded_section",
            Self::UpdatedPage => "updated_page",
            Self::UpdatedSection => "updated_section",
            Self::DeactivatedSection => "deactivated_section",
            Self::RestoredSection => "restored_section",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown activity action: {s}"))
    }
}

/// Activity log entry to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewActivity {
    pub action: ActivityAction,
    pub page_path: String,
    pub section_key: Option<String>,
    pub detail: Option<String>,
}

impl NewActivity {
    #[must_use]
    pub fn page(action: ActivityAction, page_path: impl Into<String>) -> Self {
        Self {
            action,
            page_path: page_path.into(),
            section_key: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn section(
        action: ActivityAction,
        page_path: impl Into<String>,
        section_key: impl Into<String>,
    ) -> Self {
        Self {
            action,
            page_path: page_path.into(),
            section_key: Some(section_key.into()),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Stored activity log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    pub action: ActivityAction,
    pub page_path: String,
    pub section_key: Option<String>,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn section() -> SectionRecord {
        SectionRecord::from_template(
            "/about",
            &SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Hello")
                .metadata(json!({"a": 1})),
        )
    }

    #[test]
    fn test_page_from_template_is_published() {
        let template = PageTemplate::new("/about", "About").meta("About | Agency", "Who we are");

        let page = PageRecord::from_template(&template);

        assert_eq!(page.page_path, "/about");
        assert_eq!(page.title, "About");
        assert_eq!(page.meta_title.as_deref(), Some("About | Agency"));
        assert!(page.is_published);
    }

    #[test]
    fn test_section_from_template_copies_fields() {
        let section = section();

        assert_eq!(section.page_path, "/about");
        assert_eq!(section.section_key, "hero");
        assert_eq!(section.title.as_deref(), Some("Hello"));
        assert_eq!(section.content.as_deref(), Some(""));
        assert_eq!(section.metadata, json!({"a": 1}));
        assert!(section.is_active);
    }

    #[test]
    fn test_section_filter() {
        let mut section = section();
        assert!(SectionFilter::Active.matches(&section));

        section.is_active = false;
        assert!(!SectionFilter::Active.matches(&section));
        assert!(SectionFilter::All.matches(&section));
    }

    #[test]
    fn test_page_patch_apply_keeps_unset_fields() {
        let mut page = PageRecord::from_template(&PageTemplate::new("/", "Home"));
        let patch = PagePatch {
            title: Some("Welcome".to_owned()),
            meta_description: Some(String::new()),
            ..PagePatch::default()
        };

        patch.apply(&mut page);

        assert_eq!(page.title, "Welcome");
        assert_eq!(page.meta_title.as_deref(), Some(""));
        assert_eq!(page.meta_description.as_deref(), Some(""));
        assert!(page.is_published);
    }

    #[test]
    fn test_section_patch_apply() {
        let mut section = section();
        let patch = SectionPatch {
            content: Some("Edited".to_owned()),
            display_order: Some(7),
            ..SectionPatch::default()
        };

        patch.apply(&mut section);

        assert_eq!(section.title.as_deref(), Some("Hello"));
        assert_eq!(section.content.as_deref(), Some("Edited"));
        assert_eq!(section.display_order, 7);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(PagePatch::default().is_empty());
        assert!(SectionPatch::default().is_empty());
        assert!(!SectionPatch::active(false).is_empty());
    }

    #[test]
    fn test_section_patch_deserializes_camel_case() {
        let patch: SectionPatch =
            serde_json::from_str(r#"{"displayOrder": 2, "sectionType": "faq"}"#).unwrap();

        assert_eq!(patch.display_order, Some(2));
        assert_eq!(patch.section_type, Some(SectionType::Faq));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_activity_action_round_trip() {
        for action in ActivityAction::ALL {
            assert_eq!(action.as_str().parse::<ActivityAction>(), Ok(action));
        }
        assert!("deleted_page".parse::<ActivityAction>().is_err());
    }
}
