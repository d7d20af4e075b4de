use thiserror::Error;

/// Common result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// 存储层错误（账户查询与重置记录）
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("store call timed out: {0}")]
    Timeout(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account not found")]
    AccountNotFound,
    #[error("account disabled")]
    AccountDisabled,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed token: {0}")]
    Format(String),
    #[error("token signature mismatch")]
    Integrity,
    #[error("token expired")]
    Expired,
    #[error("invalid refresh token: {0}")]
    InvalidRefreshToken(String),
    #[error("invalid or expired reset token")]
    InvalidOrExpiredResetToken,
    #[error("invalid password: {0}")]
    InvalidPassword(String),
    #[error("token duration must be positive, got {0}s")]
    InvalidDuration(i64),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("other error: {0}")]
    Other(String),
}

impl AuthError {
    /// 登录凭证类错误（对外统一为 "invalid credentials"）
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::AccountNotFound | AuthError::AccountDisabled | AuthError::InvalidCredentials
        )
    }

    /// 令牌类错误（对外统一为 "invalid or expired token"）
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            AuthError::Format(_)
                | AuthError::Integrity
                | AuthError::Expired
                | AuthError::InvalidRefreshToken(_)
        )
    }

    /// Only storage failures are worth retrying by a caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Persistence(_))
    }
}
