//! Default page content for the agency site.
//!
//! Every routable marketing page has a [`PageTemplate`]: its default title,
//! SEO text, and an ordered list of [`SectionTemplate`]s. Templates are only a
//! seed source. Once the content store holds a row for a page or section, the
//! template value for it is never read again.
//!
//! # Quick Start
//!
//! ```
//! use agency_templates::TemplateLibrary;
//!
//! let library = TemplateLibrary::builtin();
//! let about = library.get("/about").unwrap();
//! assert!(about.section("hero").is_some());
//! ```
//!
//! Additional templates can be loaded from TOML and merged over the built-in
//! set with [`TemplateLibrary::merge`].

mod builtin;
mod library;
mod template;

pub use library::{TemplateError, TemplateLibrary};
pub use template::{PageTemplate, SectionTemplate, SectionType, UnknownSectionType};
