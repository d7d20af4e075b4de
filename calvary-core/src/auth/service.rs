//! 认证服务：核心结构与构造

use super::crypto::BcryptHasher;
use super::notify::{LogNotifier, ResetNotifier};
use super::token::TokenCodec;
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result, StoreError};
use crate::store::StoreResult;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

/// 认证服务
#[derive(Debug)]
pub struct AuthService<S, H = BcryptHasher> {
    pub(super) store: S,
    pub(super) hasher: H,
    pub(super) codec: TokenCodec,
    pub(super) config: AuthConfig,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) notifier: Arc<dyn ResetNotifier>,
}

// ============================================================================
// 构造器和配置
// ============================================================================

impl<S> AuthService<S, BcryptHasher> {
    /// 使用默认 bcrypt 哈希创建服务
    pub fn new(store: S, config: AuthConfig) -> Self {
        Self::with_hasher(store, BcryptHasher::default(), config)
    }
}

impl<S, H> AuthService<S, H> {
    pub fn with_hasher(store: S, hasher: H, config: AuthConfig) -> Self {
        let codec = TokenCodec::new(config.jwt_secret(), config.issuer());
        Self {
            store,
            hasher,
            codec,
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

impl<S, H> AuthService<S, H> {
    pub(super) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 存储调用统一加超时，超时即失败，不重试
    pub(super) async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Persistence(StoreError::Timeout(op))),
        }
    }
}
