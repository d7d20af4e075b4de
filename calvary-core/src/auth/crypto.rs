//! 密码哈希与校验（可替换实现，默认 bcrypt）

use crate::error::{AuthError, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use std::future::Future;
use tracing::warn;

/// 密码哈希能力：签发与刷新流程只依赖这个接口
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> impl Future<Output = Result<String>> + Send;

    /// 不匹配返回 `Ok(false)`，不作为错误
    fn verify(&self, stored_hash: &str, candidate: &str)
        -> impl Future<Output = Result<bool>> + Send;
}

/// bcrypt 实现（在阻塞线程中执行）
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| AuthError::Hashing(format!("spawn_blocking failed: {}", e)))?
            .map_err(|e| AuthError::Hashing(format!("bcrypt hash failed: {}", e)))
    }

    async fn verify(&self, stored_hash: &str, candidate: &str) -> Result<bool> {
        let candidate = candidate.to_string();
        let stored_hash = stored_hash.to_string();
        let outcome = tokio::task::spawn_blocking(move || verify(&candidate, &stored_hash))
            .await
            .map_err(|e| AuthError::Hashing(format!("spawn_blocking failed: {}", e)))?;

        match outcome {
            Ok(matched) => Ok(matched),
            Err(e) => {
                // 存储的哈希损坏时按不匹配处理
                warn!(error = %e, "stored password hash could not be parsed");
                Ok(false)
            }
        }
    }
}
