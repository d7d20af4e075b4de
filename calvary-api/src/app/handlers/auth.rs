//! 认证相关 API handlers

use axum::extract::{Path, State};
use axum::{Extension, Json};
use calvary_core::{
    AuthError, AuthStore, AuthUser, RefreshRequest, ResetPasswordRequest, SessionClaims,
    SignInRequest, TokenPayload, UpdatePasswordRequest,
};
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::middleware::AuthInfo;
use super::super::state::AppState;

/// POST /auth/signin - 用户登录
pub async fn sign_in<S: AuthStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthUser>, ApiError> {
    if req.identifier.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }
    let auth_user = state.auth.sign_in(req.identifier.trim(), &req.password).await?;
    Ok(Json(auth_user))
}

/// POST /auth/refresh-token - 刷新 access token
pub async fn refresh_token<S: AuthStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPayload>, ApiError> {
    let payload = state
        .auth
        .refresh_access(&req.username, &req.refresh_token)?;
    Ok(Json(payload))
}

/// POST /auth/reset-password - 申请重置密码
///
/// 邮箱不存在时同样返回成功，避免暴露账户是否存在。
pub async fn reset_password<S: AuthStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    match state.auth.request_reset(req.email.trim()).await {
        Ok(_) => {}
        Err(AuthError::AccountNotFound) => {
            tracing::warn!("reset requested for unknown email");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Json(json!({ "message": "Reset password email sent" })))
}

/// GET /auth/reset-password/:token - 根据 token 获取邮箱
pub async fn email_for_reset_token<S: AuthStore>(
    State(state): State<AppState<S>>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let email = state.auth.email_for_reset_token(&token).await?;
    Ok(Json(json!({ "email": email })))
}

/// PUT /auth/update-password - 凭重置 token 修改密码
pub async fn update_password<S: AuthStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .auth
        .redeem_and_update(req.email.trim(), &req.token, &req.password)
        .await?;
    Ok(Json(json!({ "message": "Password updated" })))
}

/// GET /auth/session - 当前 access token 的 claims
pub async fn session(Extension(auth): Extension<AuthInfo>) -> Json<SessionClaims> {
    Json(auth.claims)
}
