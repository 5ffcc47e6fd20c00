use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::auth::{Argon2Hasher, TokenSigner};
use crate::config::AppConfig;
use crate::database::Stores;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::{AuthService, ItemService};

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub items: Arc<ItemService>,
    pub stores: Stores,
}

impl AppState {
    pub fn new(config: &AppConfig, stores: Stores) -> anyhow::Result<Self> {
        let tokens = TokenSigner::from_config(&config.security)?;
        let passwords = Argon2Hasher::new(config.security.password_hash)?;

        let auth = AuthService::new(stores.accounts.clone(), stores.revocations.clone(), passwords, tokens);
        let items = ItemService::new(stores.items.clone());

        Ok(Self {
            auth: Arc::new(auth),
            items: Arc::new(items),
            stores,
        })
    }
}

/// Build the full HTTP router
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .with_state(state);

    if config.api.enable_response_compression {
        router = router.layer(CompressionLayer::new());
    }
    if config.security.enable_cors {
        router = router.layer(cors_layer(config));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
    )
}

fn auth_public_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, todos};

    Router::new()
        .route("/auth/logout", get(auth::session_logout).post(auth::session_logout))
        .route("/todos", get(todos::collection_get).post(todos::collection_post))
        .route("/todos/", get(todos::collection_get).post(todos::collection_post))
        .route(
            "/todos/:id",
            axum::routing::patch(todos::record_patch).delete(todos::record_delete),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Tasklist API",
            "version": version,
            "endpoints": {
                "auth": "/auth/register, /auth/login (public); /auth/logout (bearer token)",
                "todos": "/todos, /todos/:id (bearer token)",
                "health": "/health (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = format!("{:?}", state.stores.backend()).to_lowercase();

    match state.stores.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": backend,
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "storage": backend,
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

    fn test_app() -> Router {
        let config = AppConfig::for_tests();
        let state = AppState::new(&config, Stores::memory()).unwrap();
        app(state, &config)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["storage"], "memory");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for (method, uri) in [("GET", "/todos"), ("POST", "/todos"), ("PATCH", "/todos/1"), ("DELETE", "/todos/1"), ("GET", "/auth/logout")] {
            let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
            let response = test_app().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            let body = body_json(response).await;
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let request = Request::get("/todos")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_register_body_is_bad_request() {
        let request = Request::post("/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username\": "))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_JSON");
    }
}
