//! HTTP request handlers.

pub(crate) mod admin;
pub(crate) mod pages;

/// Convert a URL tail to a page path.
///
/// Route captures arrive without the leading slash (`"about"`, `""` for the
/// root), while pages are keyed as `"/about"` and `"/"`. Trailing slashes are
/// dropped.
pub(crate) fn to_page_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}")
    }
}
