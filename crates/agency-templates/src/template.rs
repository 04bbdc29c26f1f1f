//! Template types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of content block. Closed set understood by the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Hero,
    Text,
    List,
    Features,
    Services,
    Process,
    Stats,
    Testimonials,
    Team,
    Faq,
    Cta,
    Contact,
    CaseStudies,
    Legal,
}

impl SectionType {
    /// All section types, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Hero,
        Self::Text,
        Self::List,
        Self::Features,
        Self::Services,
        Self::Process,
        Self::Stats,
        Self::Testimonials,
        Self::Team,
        Self::Faq,
        Self::Cta,
        Self::Contact,
        Self::CaseStudies,
        Self::Legal,
    ];

    /// Stored string form (matches the serde representation).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Text => "text",
            Self::List => "list",
            Self::Features => "features",
            Self::Services => "services",
            Self::Process => "process",
            Self::Stats => "stats",
            Self::Testimonials => "testimonials",
            Self::Team => "team",
            Self::Faq => "faq",
            Self::Cta => "cta",
            Self::Contact => "contact",
            Self::CaseStudies => "case_studies",
            Self::Legal => "legal",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized section type.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown section type: {0}")]
pub struct UnknownSectionType(pub String);

impl FromStr for SectionType {
    type Err = UnknownSectionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownSectionType(s.to_owned()))
    }
}

/// Default content of one section within a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionTemplate {
    /// Identifier, unique within the page (e.g., "hero", "services").
    pub section_key: String,
    /// Default heading.
    #[serde(default)]
    pub title: String,
    /// Default body text.
    #[serde(default)]
    pub content: String,
    /// Kind of block.
    pub section_type: SectionType,
    /// Rendering position among siblings.
    #[serde(default)]
    pub display_order: i32,
    /// Open-ended structured extras (list items, CTA targets, ...).
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl SectionTemplate {
    /// Create a section template with empty text and metadata.
    #[must_use]
    pub fn new(section_key: impl Into<String>, section_type: SectionType, display_order: i32) -> Self {
        Self {
            section_key: section_key.into(),
            title: String::new(),
            content: String::new(),
            section_type,
            display_order,
            metadata: empty_metadata(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Default content of one routable page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageTemplate {
    /// Route path (e.g., "/", "/about").
    pub path: String,
    /// Default display title.
    pub title: String,
    /// Default `<title>` text.
    #[serde(default)]
    pub meta_title: String,
    /// Default meta description.
    #[serde(default)]
    pub meta_description: String,
    /// Sections in template order.
    #[serde(default)]
    pub sections: Vec<SectionTemplate>,
}

impl PageTemplate {
    /// Create a page template without sections.
    #[must_use]
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            meta_title: String::new(),
            meta_description: String::new(),
            sections: Vec::new(),
        }
    }

    /// Set meta title and description.
    #[must_use]
    pub fn meta(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.meta_title = title.into();
        self.meta_description = description.into();
        self
    }

    /// Append a section.
    #[must_use]
    pub fn with_section(mut self, section: SectionTemplate) -> Self {
        self.sections.push(section);
        self
    }

    /// Look up a section by key.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&SectionTemplate> {
        self.sections.iter().find(|s| s.section_key == key)
    }

    /// Section keys in template order.
    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.section_key.as_str())
    }
}
