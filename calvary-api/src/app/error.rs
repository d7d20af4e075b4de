use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calvary_core::AuthError;
use serde::Serialize;

/// 对外错误体：`{"code": .., "message": ..}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 缺少 bearer token
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", "missing bearer token")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }
}

/// 对外不区分具体失败原因，具体类型只写日志
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            e if e.is_credential_failure() => {
                tracing::warn!(reason = %e, "credential check failed");
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "InvalidCredentials",
                    "invalid credentials",
                )
            }
            e if e.is_token_failure() => {
                tracing::warn!(reason = %e, "token rejected");
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "InvalidToken",
                    "invalid or expired token",
                )
            }
            AuthError::InvalidOrExpiredResetToken => Self::new(
                StatusCode::BAD_REQUEST,
                "InvalidResetToken",
                "invalid or expired reset token",
            ),
            AuthError::InvalidPassword(msg) => {
                Self::new(StatusCode::BAD_REQUEST, "InvalidPassword", msg)
            }
            AuthError::InvalidDuration(secs) => {
                Self::bad_request(format!("token duration out of range: {secs}s"))
            }
            AuthError::Persistence(e) => {
                tracing::error!(error = %e, "store failure");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Unavailable",
                    "service temporarily unavailable",
                )
            }
            other => {
                tracing::error!(error = %other, "auth failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error",
                    "internal server error",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
