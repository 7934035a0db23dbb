use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{elevated::admin, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Multipart framing and text fields on top of the attachment itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(request_routes(&state))
        .merge(journal_routes())
        .merge(catalog_routes())
        .merge(admin_routes())
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(public::login_post))
        // Protected API
        .merge(protected)
        // Global middleware
        .layer(cors_layer(&state.config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn request_routes(state: &AppState) -> Router<AppState> {
    use protected::requests;

    let body_limit = state.config.storage.max_attachment_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/api/requests",
            get(requests::requests_list).post(requests::request_create),
        )
        .route("/api/requests/mine", get(requests::requests_mine))
        .route("/api/requests/area", get(requests::requests_inbox))
        .route("/api/requests/area/:area_id", get(requests::requests_by_area))
        .route(
            "/api/requests/:id",
            get(requests::request_show).put(requests::request_edit),
        )
        .route("/api/requests/:id/attachment", get(requests::request_attachment))
        .route("/api/requests/:id/export/pdf", get(requests::request_export_pdf))
        .route("/api/requests/:id/export/png", get(requests::request_export_png))
        // Lifecycle transitions
        .route("/api/requests/:id/take", post(requests::request_take))
        .route("/api/requests/:id/assign", post(requests::request_assign))
        .route("/api/requests/:id/unassign", post(requests::request_unassign))
        .route("/api/requests/:id/status", put(requests::request_status))
        .route("/api/requests/:id/reject", post(requests::request_reject))
        .route("/api/requests/:id/close", post(requests::request_close))
        .layer(DefaultBodyLimit::max(body_limit))
}

fn journal_routes() -> Router<AppState> {
    use protected::journal;

    Router::new()
        .route(
            "/api/requests/:id/comments",
            get(journal::comments_list).post(journal::comment_create),
        )
        .route("/api/requests/:id/history", get(journal::history_list))
}

fn catalog_routes() -> Router<AppState> {
    use protected::catalog;

    Router::new()
        .route("/api/catalog/areas", get(catalog::catalog_areas))
        .route("/api/catalog/areas/:id/agents", get(catalog::catalog_area_agents))
        .route("/api/catalog/request-types", get(catalog::catalog_request_types))
        .route("/api/catalog/priorities", get(catalog::catalog_priorities))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        // Areas
        .route("/api/admin/areas", get(admin::areas::list).post(admin::areas::create))
        .route(
            "/api/admin/areas/:id",
            get(admin::areas::show)
                .put(admin::areas::update)
                .delete(admin::areas::delete),
        )
        // Request types
        .route(
            "/api/admin/request-types",
            get(admin::request_types::list).post(admin::request_types::create),
        )
        .route(
            "/api/admin/request-types/:id",
            get(admin::request_types::show)
                .put(admin::request_types::update)
                .delete(admin::request_types::delete),
        )
        .route(
            "/api/admin/request-types/:id/toggle",
            post(admin::request_types::toggle),
        )
        // Users
        .route("/api/admin/users", get(admin::users::list).post(admin::users::create))
        .route(
            "/api/admin/users/:id",
            get(admin::users::show)
                .put(admin::users::update)
                .delete(admin::users::delete),
        )
        .route(
            "/api/admin/users/:id/reset-password",
            post(admin::users::reset_password),
        )
        // Request views
        .route("/api/admin/requests/unassigned", get(admin::requests::unassigned))
        .route("/api/admin/requests/other", get(admin::requests::other))
        // Reports
        .route("/api/admin/reports/summary", get(admin::reports::summary))
        .route("/api/admin/reports/by-area", get(admin::reports::by_area))
        .route("/api/admin/reports/agents", get(admin::reports::agents))
        .route(
            "/api/admin/reports/response-times",
            get(admin::reports::response_times),
        )
        .route("/api/admin/reports/export", get(admin::reports::export))
}

/// `*` allows any origin; otherwise only the configured list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Desk API (Rust)",
            "version": version,
            "description": "Request desk: solicitudes routed to area agents through a status workflow",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login (public - token acquisition)",
                "requests": "/api/requests[/:id[/take|assign|unassign|status|reject|close|attachment]] (protected)",
                "journal": "/api/requests/:id/{comments,history} (protected)",
                "catalog": "/api/catalog/{areas,request-types,priorities} (protected)",
                "admin": "/api/admin/{areas,request-types,users,requests,reports} (administrators)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "statusCode": 503,
                    "message": "Database unavailable",
                    "details": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::testing::TestContext;

    async fn test_app() -> Router {
        let ctx = TestContext::new().await.unwrap();
        app(AppState::new(ctx.store, ctx.blobs, (*ctx.config).clone()))
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn cors_accepts_wildcard_and_lists() {
        // Construction must not panic for either form
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://localhost:5173".to_string(), "not a header\n".to_string()]);
    }

    #[tokio::test]
    async fn health_reports_ok_on_memory_store() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(test_app().await, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["database"], "ok");
    }

    #[tokio::test]
    async fn api_routes_reject_missing_token() {
        let request = Request::get("/api/catalog/priorities").body(Body::empty()).unwrap();
        let (status, body) = call(test_app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["statusCode"], 401);
    }

    #[tokio::test]
    async fn login_then_call_a_protected_route() {
        let router = test_app().await;
        let login = Request::post("/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":"alice","password":"desk-demo"}"#))
            .unwrap();
        let (status, body) = call(router.clone(), login).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let request = Request::get("/api/catalog/priorities")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(3));
    }
}
