//! Pages API endpoint.
//!
//! Resolves a page through the content reader and returns it as JSON with an
//! `ETag` for conditional requests.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};

use crate::error::ServerError;
use crate::handlers::to_page_path;
use crate::state::AppState;

/// Handle GET /api/pages/ (home page).
pub(crate) async fn get_root_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    get_page_impl("/".to_owned(), &state, &headers).await
}

/// Handle GET /api/pages/{path}.
pub(crate) async fn get_page(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    get_page_impl(to_page_path(&path), &state, &headers).await
}

async fn get_page_impl(
    path: String,
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    let Some(page) = state.reader.resolve(&path).await else {
        return Err(ServerError::PageNotFound(path));
    };
    if !page.is_published {
        tracing::debug!(path, "Unpublished page requested");
        return Err(ServerError::PageNotFound(path));
    }

    let body = serde_json::to_string(page.as_ref())?;
    let etag = compute_etag(&state.version, &body);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "no-cache".to_owned()),
        ],
        body,
    )
        .into_response())
}

/// Compute `ETag` from version and content.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}
