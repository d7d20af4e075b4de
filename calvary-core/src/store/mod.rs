//! 存储协作接口：账户查询与重置密码记录

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreConfig};

use crate::auth::{Account, NewResetPassword, ResetPasswordRecord};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use std::future::Future;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 账户存储（由用户服务拥有，认证核心只读账户、只写密码哈希）
pub trait CredentialStore: Send + Sync {
    /// 按登录标识查找：邮箱优先，其次用户名
    fn find_by_login(
        &self,
        identifier: &str,
    ) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    fn find_by_email(&self, email: &str)
        -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    fn find_by_id(&self, id: i64) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    /// 覆盖密码哈希并更新 updated_at，返回是否命中账户
    fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// 重置密码记录存储
pub trait ResetTokenStore: Send + Sync {
    fn insert_reset(
        &self,
        record: NewResetPassword,
    ) -> impl Future<Output = StoreResult<ResetPasswordRecord>> + Send;

    /// 按邮箱 + token 取最新且 `now < expires_at` 的记录
    fn find_valid_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<ResetPasswordRecord>>> + Send;

    /// 仅按 token 取最新且未过期的记录
    fn find_reset_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<ResetPasswordRecord>>> + Send;

    /// 原子地消耗记录 `id` 并写入 `user_id` 的新密码哈希。
    ///
    /// 记录已被消耗、在 `updated_at` 时已过期或账户不存在时返回 `false`，
    /// 且不做任何修改；
    /// 失败时两项写入都不生效。
    fn redeem_reset(
        &self,
        id: i64,
        user_id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// 删除所有 `expires_at <= now` 的记录，返回删除条数
    fn purge_expired_resets(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}

/// 同时提供两类存储的后端
pub trait AuthStore: CredentialStore + ResetTokenStore + 'static {}

impl<T> AuthStore for T where T: CredentialStore + ResetTokenStore + 'static {}
