//! 认证核心配置：签名密钥、issuer、各类 token 有效期

use crate::error::{AuthError, Result};
use chrono::Duration;
use std::fmt;

/// 签发 token 时写入的固定 issuer
pub const DEFAULT_ISSUER: &str = "calvary-admin-system";

/// Access token 默认有效期（秒）
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 30 * 60;
/// Refresh token 默认有效期（秒）
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 3600;
/// 重置密码 token 默认有效期（秒）
pub const DEFAULT_RESET_TTL_SECS: i64 = 5 * 24 * 3600;
/// 单次存储调用的默认超时
pub const DEFAULT_STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
/// 任一有效期的上限（十年），保证 `now + ttl` 不会溢出
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 3600;

#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    issuer: String,
    /// 以下三项单位为秒，`validate` 之前可能越界
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    reset_ttl_secs: i64,
    store_timeout: std::time::Duration,
}

impl AuthConfig {
    /// 创建配置；密钥为空时直接失败，而不是等到第一次签发
    pub fn new(jwt_secret: impl Into<String>) -> Result<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.trim().is_empty() {
            return Err(AuthError::Config("jwt secret must not be empty".into()));
        }
        Ok(Self {
            jwt_secret,
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            reset_ttl_secs: DEFAULT_RESET_TTL_SECS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// 配置 token 有效期（秒）
    pub fn with_ttl(mut self, access_ttl: i64, refresh_ttl: i64) -> Self {
        self.access_ttl_secs = access_ttl;
        self.refresh_ttl_secs = refresh_ttl;
        self
    }

    pub fn with_reset_ttl(mut self, reset_ttl: i64) -> Self {
        self.reset_ttl_secs = reset_ttl;
        self
    }

    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// 校验有效期组合：全部在 (0, MAX_TTL_SECS] 内，且 refresh 长于 access
    pub fn validate(&self) -> Result<()> {
        for secs in [self.access_ttl_secs, self.refresh_ttl_secs, self.reset_ttl_secs] {
            if secs <= 0 || secs > MAX_TTL_SECS {
                return Err(AuthError::InvalidDuration(secs));
            }
        }
        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(AuthError::Config(
                "refresh token ttl must be longer than access token ttl".into(),
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(AuthError::Config("store timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub(crate) fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_token_ttl(&self) -> Duration {
        ttl(self.access_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        ttl(self.refresh_ttl_secs)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        ttl(self.reset_ttl_secs)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        self.store_timeout
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("reset_ttl_secs", &self.reset_ttl_secs)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

/// 超出 `TimeDelta` 表示范围时饱和，由签发处的 checked 运算报错
fn ttl(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 {
        Duration::MIN
    } else {
        Duration::MAX
    })
}
