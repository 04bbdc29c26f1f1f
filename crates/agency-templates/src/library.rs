//! Validated collection of page templates.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::template::PageTemplate;

/// Template validation or parse error.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Two templates claim the same path.
    #[error("duplicate template for path {0}")]
    DuplicatePath(String),
    /// A section key appears twice within one page.
    #[error("duplicate section key {key:?} in template {path}")]
    DuplicateSection {
        /// Page path.
        path: String,
        /// Repeated section key.
        key: String,
    },
    /// Path is empty or not rooted.
    #[error("template path must start with '/': {0:?}")]
    InvalidPath(String),
    /// TOML parsing error.
    #[error("template parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// TOML file layout: a list of `[[pages]]` tables.
#[derive(Deserialize)]
struct TemplateFile {
    #[serde(default)]
    pages: Vec<PageTemplate>,
}

/// Read-only set of page templates keyed by path.
///
/// Construction validates that each path has at most one template and that
/// section keys are unique within a page. Iteration follows insertion order.
#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    pages: Vec<PageTemplate>,
    index: HashMap<String, usize>,
}

impl TemplateLibrary {
    /// Build a library from templates.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if a path is duplicated, a path is not
    /// rooted, or a page repeats a section key.
    pub fn new(pages: Vec<PageTemplate>) -> Result<Self, TemplateError> {
        let mut index = HashMap::with_capacity(pages.len());
        for (position, page) in pages.iter().enumerate() {
            validate_page(page)?;
            if index.insert(page.path.clone(), position).is_some() {
                return Err(TemplateError::DuplicatePath(page.path.clone()));
            }
        }
        Ok(Self { pages, index })
    }

    /// The agency's built-in page set.
    #[must_use]
    pub fn builtin() -> Self {
        let pages = crate::builtin::pages();
        let index = pages
            .iter()
            .enumerate()
            .map(|(position, page)| (page.path.clone(), position))
            .collect();
        Self { pages, index }
    }

    /// Parse templates from a TOML document with `[[pages]]` entries.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] on malformed TOML, or a validation
    /// error as in [`TemplateLibrary::new`].
    pub fn from_toml(content: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile = toml::from_str(content)?;
        Self::new(file.pages)
    }

    /// Merge `other` over `self`. Templates from `other` replace ones with the
    /// same path; new paths are appended.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for page in other.pages {
            if let Some(&position) = self.index.get(&page.path) {
                self.pages[position] = page;
            } else {
                self.index.insert(page.path.clone(), self.pages.len());
                self.pages.push(page);
            }
        }
        self
    }

    /// Template for a path, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PageTemplate> {
        self.index.get(path).map(|&position| &self.pages[position])
    }

    /// Whether a template exists for the path.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate over all templates.
    pub fn iter(&self) -> impl Iterator<Item = &PageTemplate> {
        self.pages.iter()
    }

    /// All template paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.path.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn validate_page(page: &PageTemplate) -> Result<(), TemplateError> {
    if !page.path.starts_with('/') {
        return Err(TemplateError::InvalidPath(page.path.clone()));
    }
    let mut seen = HashSet::new();
    for key in page.section_keys() {
        if !seen.insert(key) {
            return Err(TemplateError::DuplicateSection {
                path: page.path.clone(),
                key: key.to_owned(),
            });
        }
    }
    Ok(())
}
