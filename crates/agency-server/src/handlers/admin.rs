//! Admin API endpoints.
//!
//! Editor writes, batch initialization, the content audit and the activity
//! log. Requests are not authenticated.

use std::sync::Arc;
use std::time::Instant;

use agency_content::{BatchFailure, MissingSections};
use agency_store::{ActivityEntry, PagePatch, PageRecord, SectionPatch, SectionRecord};
use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Default number of activity entries returned.
const DEFAULT_ACTIVITY_LIMIT: usize = 50;
/// Upper bound on `?limit=`.
const MAX_ACTIVITY_LIMIT: usize = 500;

/// Body of PATCH /api/admin/pages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePageRequest {
    page_path: String,
    #[serde(flatten)]
    patch: PagePatch,
}

/// Body of PATCH /api/admin/sections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateSectionRequest {
    page_path: String,
    section_key: String,
    #[serde(flatten)]
    patch: SectionPatch,
}

/// Response for POST /api/admin/initialize.
#[derive(Debug, Serialize)]
pub(crate) struct InitializeResponse {
    success: usize,
    failed: usize,
    failures: Vec<BatchFailure>,
}

/// Response for GET /api/admin/audit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuditResponse {
    missing_pages: Vec<String>,
    pages_with_missing_sections: Vec<MissingSections>,
}

/// Query of GET /api/admin/activity.
#[derive(Debug, Deserialize)]
pub(crate) struct ActivityQuery {
    limit: Option<usize>,
}

/// Handle PATCH /api/admin/pages.
pub(crate) async fn update_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdatePageRequest>,
) -> Result<Json<PageRecord>, ServerError> {
    check_page_path(&request.page_path)?;
    let page = state
        .editor
        .update_page(&request.page_path, &request.patch)
        .await?;
    Ok(Json(page))
}

/// Handle PATCH /api/admin/sections.
pub(crate) async fn update_section(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateSectionRequest>,
) -> Result<Json<SectionRecord>, ServerError> {
    check_page_path(&request.page_path)?;
    if request.section_key.is_empty() {
        return Err(ServerError::BadRequest("sectionKey must not be empty".to_owned()));
    }
    let section = state
        .editor
        .update_section(&request.page_path, &request.section_key, &request.patch)
        .await?;
    Ok(Json(section))
}

/// Handle POST /api/admin/initialize.
pub(crate) async fn initialize(State(state): State<Arc<AppState>>) -> Json<InitializeResponse> {
    let start = Instant::now();
    let report = state.reconciler.initialize_all_pages().await;
    tracing::info!(
        success = report.success(),
        failed = report.failed(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Initialization requested"
    );
    Json(InitializeResponse {
        success: report.success(),
        failed: report.failed(),
        failures: report.failures,
    })
}

/// Handle GET /api/admin/audit.
pub(crate) async fn audit(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AuditResponse>, ServerError> {
    let missing_pages = state.reconciler.missing_pages().await?;
    let pages_with_missing_sections = state.reconciler.pages_with_missing_sections().await?;
    Ok(Json(AuditResponse {
        missing_pages,
        pages_with_missing_sections,
    }))
}

/// Handle GET /api/admin/activity.
pub(crate) async fn activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let entries = state.store.activities(limit).await?;
    Ok(Json(entries))
}

fn check_page_path(path: &str) -> Result<(), ServerError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ServerError::BadRequest(format!(
            "pagePath must start with '/': {path:?}"
        )))
    }
}
