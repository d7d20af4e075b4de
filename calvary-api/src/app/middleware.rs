use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use calvary_core::{AuthStore, SessionClaims};

use super::error::ApiError;
use super::state::AppState;

/// 认证信息扩展
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub claims: SessionClaims,
}

/// 从 Authorization header 提取 Bearer token
fn extract_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 要求有效的 access token，校验通过后把 claims 放入请求扩展
pub async fn require_access_token<S: AuthStore>(
    State(state): State<AppState<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request).ok_or_else(ApiError::unauthorized)?;
    let claims = state.auth.verify_token(token)?;

    request.extensions_mut().insert(AuthInfo { claims });
    Ok(next.run(request).await)
}
