//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_updates;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let page_routes = Router::new()
        .route("/api/pages/", get(handlers::pages::get_root_page))
        .route("/api/pages/{*path}", get(handlers::pages::get_page));

    let admin_routes = Router::new()
        .route("/api/admin/pages", patch(handlers::admin::update_page))
        .route("/api/admin/sections", patch(handlers::admin::update_section))
        .route("/api/admin/initialize", post(handlers::admin::initialize))
        .route("/api/admin/audit", get(handlers::admin::audit))
        .route("/api/admin/activity", get(handlers::admin::activity));

    let mut router = Router::new().merge(page_routes).merge(admin_routes);

    if state.live_updates {
        router = router.route("/ws/content", get(live_updates::ws_handler));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::csp_layer())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer())
                .layer(security::referrer_policy_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use agency_content::MissingPagePolicy;
    use agency_store::{ContentStore, MockStore, PageRecord, SectionRecord};
    use agency_templates::{PageTemplate, SectionTemplate, SectionType, TemplateLibrary};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn templates() -> Arc<TemplateLibrary> {
        let about = PageTemplate::new("/about", "About Us")
            .with_section(SectionTemplate::new("hero", SectionType::Hero, 1).title("Who we are"))
            .with_section(SectionTemplate::new("team", SectionType::Team, 2));
        let faq = PageTemplate::new("/faq", "FAQ")
            .with_section(SectionTemplate::new("faq", SectionType::Faq, 1));
        Arc::new(TemplateLibrary::new(vec![about, faq]).unwrap())
    }

    fn router(store: &Arc<MockStore>, policy: MissingPagePolicy) -> Router {
        let shared = Arc::clone(store) as Arc<dyn ContentStore>;
        let state = AppState::new(shared, templates(), policy, true, "1.0.0".to_owned());
        create_router(Arc::new(state))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_page_materializes_template() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::Materialize);

        let response = app
            .oneshot(request(Method::GET, "/api/pages/about", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ETAG));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["referrer-policy"], "no-referrer");
        let body = json_body(response).await;
        assert_eq!(body["path"], "/about");
        assert_eq!(body["title"], "About Us");
        assert_eq!(body["sections"][0]["sectionKey"], "hero");
        assert_eq!(store.page_rows("/about"), 1);
        assert_eq!(store.section_rows("/about"), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_page_is_404() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::Materialize);

        let response = app
            .oneshot(request(Method::GET, "/api/pages/nope", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["path"], "/nope");
    }

    #[tokio::test]
    async fn test_get_unpublished_page_is_404() {
        let mut page = PageRecord::from_template(&PageTemplate::new("/faq", "FAQ"));
        page.is_published = false;
        let store = Arc::new(MockStore::new().with_page(page));
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(Method::GET, "/api/pages/faq", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_page_if_none_match_is_304() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let first = app
            .clone()
            .oneshot(request(Method::GET, "/api/pages/faq", None))
            .await
            .unwrap();
        let etag = first.headers()[header::ETAG].clone();

        let second = app
            .oneshot(
                Request::builder()
                    .uri("/api/pages/faq")
                    .header(header::IF_NONE_MATCH, etag)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_patch_page_updates_title() {
        let page = PageRecord::from_template(&PageTemplate::new("/about", "About Us"));
        let store = Arc::new(MockStore::new().with_page(page));
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                "/api/admin/pages",
                Some(json!({"pagePath": "/about", "title": "About the Agency"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "About the Agency");

        let page = app
            .oneshot(request(Method::GET, "/api/pages/about", None))
            .await
            .unwrap();
        assert_eq!(json_body(page).await["title"], "About the Agency");
    }

    #[tokio::test]
    async fn test_patch_missing_section_is_404() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(
                Method::PATCH,
                "/api/admin/sections",
                Some(json!({"pagePath": "/about", "sectionKey": "hero", "content": "Hi"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_relative_path_is_400() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(
                Method::PATCH,
                "/api/admin/pages",
                Some(json!({"pagePath": "about", "title": "About"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_initialize_reports_counts() {
        let store = Arc::new(MockStore::new().fail_writes_for("/faq"));
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(Method::POST, "/api/admin/initialize", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["failures"][0]["path"], "/faq");
    }

    #[tokio::test]
    async fn test_audit_lists_gaps() {
        let about = PageTemplate::new("/about", "About Us");
        let store = Arc::new(
            MockStore::new()
                .with_page(PageRecord::from_template(&about))
                .with_section(SectionRecord::from_template(
                    "/about",
                    &SectionTemplate::new("hero", SectionType::Hero, 1),
                )),
        );
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(Method::GET, "/api/admin/audit", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "missingPages": ["/faq"],
                "pagesWithMissingSections": [
                    {"pagePath": "/about", "missingKeys": ["team"]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_activity_lists_recent_entries() {
        let store = Arc::new(MockStore::new());
        let app = router(&store, MissingPagePolicy::TemplateFallback);
        app.clone()
            .oneshot(request(Method::POST, "/api/admin/initialize", None))
            .await
            .unwrap();

        let response = app
            .oneshot(request(Method::GET, "/api/admin/activity?limit=1", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_503() {
        let store = Arc::new(MockStore::new());
        store.set_unavailable(true);
        let app = router(&store, MissingPagePolicy::TemplateFallback);

        let response = app
            .oneshot(request(Method::GET, "/api/admin/audit", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
