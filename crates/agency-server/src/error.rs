//! Error types for the HTTP server.

use agency_store::{StoreError, StoreErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No page is served at the given path.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Request payload was rejected before reaching the store.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Content store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Response serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::PageNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e.kind {
                StoreErrorKind::NotFound => StatusCode::NOT_FOUND,
                StoreErrorKind::InvalidData => StatusCode::BAD_REQUEST,
                StoreErrorKind::AlreadyExists => StatusCode::CONFLICT,
                StoreErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                StoreErrorKind::Unavailable | StoreErrorKind::Timeout => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::PageNotFound(path) => json!({"error": "Page not found", "path": path}),
            Self::BadRequest(message) => json!({"error": message}),
            Self::Json(e) => json!({"error": e.to_string()}),
            Self::Store(e) => {
                if status.is_server_error() {
                    tracing::error!(error = %e, "Store request failed");
                }
                json!({"error": e.to_string(), "path": e.path})
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_page_not_found_is_404() {
        let response = ServerError::PageNotFound("/nope".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_error_status_mapping() {
        let cases = [
            (StoreErrorKind::NotFound, StatusCode::NOT_FOUND),
            (StoreErrorKind::InvalidData, StatusCode::BAD_REQUEST),
            (StoreErrorKind::AlreadyExists, StatusCode::CONFLICT),
            (StoreErrorKind::PermissionDenied, StatusCode::FORBIDDEN),
            (StoreErrorKind::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (StoreErrorKind::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (StoreErrorKind::Other, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (kind, expected) in cases {
            let response = ServerError::from(StoreError::new(kind)).into_response();
            assert_eq!(response.status(), expected, "{kind:?}");
        }
    }
}
