use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use calvary_core::AuthStore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    email_for_reset_token, handler_404, health, refresh_token, reset_password, session, sign_in,
    update_password,
};
use super::middleware::require_access_token;
use super::state::AppState;

/// 未配置来源时放开所有来源，但不携带凭证
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        tracing::warn!("CORS_ORIGINS not configured, allowing all origins");
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed).allow_credentials(true)
}

/// Build the router with routes and middleware wired.
pub fn app_router<S: AuthStore>(state: AppState<S>, cors_origins: Vec<String>) -> Router {
    // 公开端点（不需要认证）
    let public_routes = Router::new()
        .route("/auth/signin", post(sign_in::<S>))
        .route("/auth/refresh-token", post(refresh_token::<S>))
        .route("/auth/reset-password", post(reset_password::<S>))
        .route("/auth/reset-password/:token", get(email_for_reset_token::<S>))
        .route("/auth/update-password", put(update_password::<S>));

    // 需要 access token 的端点
    let protected_routes = Router::new()
        .route("/auth/session", get(session))
        .route_layer(from_fn_with_state(state.clone(), require_access_token::<S>));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .fallback(handler_404)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&cors_origins))
        .with_state(state)
}
