//! 重置密码：申请一次性 token、凭 token 修改密码

use super::crypto::PasswordHasher;
use super::models::*;
use super::AuthService;
use crate::error::{AuthError, Result};
use crate::store::{CredentialStore, ResetTokenStore};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{info, instrument, warn};

/// 重置 token 的随机字节数（hex 编码后长度翻倍）
pub const RESET_TOKEN_BYTES: usize = 32;

/// 生成随机重置 token（hex 编码）
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl<S, H> AuthService<S, H>
where
    S: CredentialStore + ResetTokenStore,
    H: PasswordHasher,
{
    /// 申请重置密码：写入一条带过期时间的记录并通知
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<ResetPasswordRecord> {
        let account = self
            .bounded("find_by_email", self.store.find_by_email(email))
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let now = self.now();
        let ttl = self.config.reset_token_ttl();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::InvalidDuration(ttl.num_seconds()))?;
        let record = NewResetPassword {
            user_id: account.id,
            token: generate_reset_token(),
            expires_at,
            created_at: now,
        };
        let stored = self
            .bounded("insert_reset", self.store.insert_reset(record))
            .await?;

        self.notifier
            .reset_requested(&account, &stored.token, stored.expires_at);
        info!(user_id = account.id, reset_id = stored.id, "reset token issued");
        Ok(stored)
    }

    /// 凭 token 修改密码；成功后该 token 失效，其余未过期 token 保留
    #[instrument(skip(self, token, new_password))]
    pub async fn redeem_and_update(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<()> {
        let now = self.now();
        let record = self
            .bounded("find_valid_reset", self.store.find_valid_reset(email, token, now))
            .await?
            .ok_or(AuthError::InvalidOrExpiredResetToken)?;

        if new_password.is_empty() {
            return Err(AuthError::InvalidPassword("password must not be empty".into()));
        }

        let password_hash = self.hasher.hash(new_password).await?;
        // 记录的消耗与密码写入同时生效；并发兑换只有一个能成功
        let redeemed = self
            .bounded(
                "redeem_reset",
                self.store
                    .redeem_reset(record.id, record.user_id, &password_hash, now),
            )
            .await?;
        if !redeemed {
            warn!(user_id = record.user_id, "reset token already consumed or account missing");
            return Err(AuthError::InvalidOrExpiredResetToken);
        }

        info!(user_id = record.user_id, "password updated via reset token");
        Ok(())
    }

    /// 根据 token 查邮箱（重置页面预填）
    #[instrument(skip(self, token))]
    pub async fn email_for_reset_token(&self, token: &str) -> Result<String> {
        let now = self.now();
        let record = self
            .bounded("find_reset_by_token", self.store.find_reset_by_token(token, now))
            .await?
            .ok_or(AuthError::InvalidOrExpiredResetToken)?;

        let account = self
            .bounded("find_by_id", self.store.find_by_id(record.user_id))
            .await?
            .ok_or(AuthError::InvalidOrExpiredResetToken)?;
        Ok(account.email)
    }

    /// 清理已过期的重置记录
    #[instrument(skip(self))]
    pub async fn purge_expired_resets(&self) -> Result<u64> {
        let now = self.now();
        let removed = self
            .bounded("purge_expired_resets", self.store.purge_expired_resets(now))
            .await?;
        if removed > 0 {
            info!(removed, "expired reset records purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptHasher;
    use crate::clock::ManualClock;
    use crate::config::AuthConfig;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, StoreResult};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    const EMAIL: &str = "alice@example.com";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    async fn service() -> (AuthService<MemoryStore>, Arc<ManualClock>) {
        let hasher = BcryptHasher::new(4);
        let store = MemoryStore::new();
        store
            .put_account(Account {
                id: 1,
                username: "alice".into(),
                email: EMAIL.into(),
                password_hash: hasher.hash("old-password").await.unwrap(),
                role: "admin".into(),
                is_exist: true,
                is_verified: true,
                verify_token: None,
                verify_token_expires: None,
                created_at: t0(),
                updated_at: t0(),
            })
            .await;
        let clock = Arc::new(ManualClock::new(t0()));
        let config = AuthConfig::new("test-secret").unwrap();
        let service = AuthService::with_hasher(store, hasher, config).with_clock(clock.clone());
        (service, clock)
    }

    #[test]
    fn reset_tokens_are_hex_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn request_records_five_day_expiry() {
        let (service, _) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();
        assert_eq!(record.user_id, 1);
        assert_eq!(record.created_at, t0());
        assert_eq!(record.expires_at, t0() + Duration::days(5));
        assert_eq!(service.store().resets_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn request_for_unknown_email() {
        let (service, _) = service().await;
        let err = service.request_reset("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound));
    }

    #[tokio::test]
    async fn redeem_swaps_password() {
        let (service, clock) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();

        clock.advance(Duration::days(1));
        service
            .redeem_and_update(EMAIL, &record.token, "new-password")
            .await
            .unwrap();

        assert!(service.sign_in(EMAIL, "new-password").await.is_ok());
        let err = service.sign_in(EMAIL, "old-password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let account = service.store().account(1).await.unwrap();
        assert_eq!(account.updated_at, t0() + Duration::days(1));
    }

    #[tokio::test]
    async fn redeem_after_expiry_fails() {
        let (service, clock) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();

        clock.set(t0() + Duration::days(5) + Duration::seconds(1));
        let err = service
            .redeem_and_update(EMAIL, &record.token, "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredResetToken));
        assert!(service.sign_in(EMAIL, "old-password").await.is_ok());
    }

    #[tokio::test]
    async fn redeem_rejects_wrong_email_or_token() {
        let (service, _) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();

        let err = service
            .redeem_and_update("bob@example.com", &record.token, "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredResetToken));

        let err = service
            .redeem_and_update(EMAIL, "deadbeef", "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredResetToken));
    }

    #[tokio::test]
    async fn token_is_single_use_but_others_survive() {
        let (service, _) = service().await;
        let first = service.request_reset(EMAIL).await.unwrap();
        let second = service.request_reset(EMAIL).await.unwrap();

        service
            .redeem_and_update(EMAIL, &first.token, "new-password")
            .await
            .unwrap();
        let err = service
            .redeem_and_update(EMAIL, &first.token, "another")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredResetToken));

        service
            .redeem_and_update(EMAIL, &second.token, "third-password")
            .await
            .unwrap();
        assert!(service.sign_in(EMAIL, "third-password").await.is_ok());
    }

    #[tokio::test]
    async fn empty_password_is_refused() {
        let (service, _) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();
        let err = service
            .redeem_and_update(EMAIL, &record.token, "")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword(_)));
        // token 未被消耗
        assert_eq!(service.store().resets_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn email_lookup_by_token() {
        let (service, clock) = service().await;
        let record = service.request_reset(EMAIL).await.unwrap();
        assert_eq!(service.email_for_reset_token(&record.token).await.unwrap(), EMAIL);

        clock.advance(Duration::days(6));
        let err = service.email_for_reset_token(&record.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredResetToken));
        assert_eq!(service.purge_expired_resets().await.unwrap(), 1);
    }

    /// 永不返回的存储，用于验证超时
    #[derive(Debug)]
    struct StalledStore;

    impl CredentialStore for StalledStore {
        async fn find_by_login(&self, _: &str) -> StoreResult<Option<Account>> {
            std::future::pending().await
        }
        async fn find_by_email(&self, _: &str) -> StoreResult<Option<Account>> {
            std::future::pending().await
        }
        async fn find_by_id(&self, _: i64) -> StoreResult<Option<Account>> {
            std::future::pending().await
        }
        async fn update_password(&self, _: i64, _: &str, _: DateTime<Utc>) -> StoreResult<bool> {
            std::future::pending().await
        }
    }

    impl ResetTokenStore for StalledStore {
        async fn insert_reset(&self, _: NewResetPassword) -> StoreResult<ResetPasswordRecord> {
            std::future::pending().await
        }
        async fn find_valid_reset(
            &self,
            _: &str,
            _: &str,
            _: DateTime<Utc>,
        ) -> StoreResult<Option<ResetPasswordRecord>> {
            std::future::pending().await
        }
        async fn find_reset_by_token(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> StoreResult<Option<ResetPasswordRecord>> {
            std::future::pending().await
        }
        async fn redeem_reset(
            &self,
            _: i64,
            _: i64,
            _: &str,
            _: DateTime<Utc>,
        ) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn purge_expired_resets(&self, _: DateTime<Utc>) -> StoreResult<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_store_times_out() {
        let config = AuthConfig::new("test-secret")
            .unwrap()
            .with_store_timeout(std::time::Duration::from_millis(20));
        let service = AuthService::with_hasher(StalledStore, BcryptHasher::new(4), config);

        let err = service.request_reset(EMAIL).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Persistence(StoreError::Timeout("find_by_email"))
        ));
        assert!(err.is_transient());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_redeems_change_password_once() {
        let (service, _) = service().await;
        let service = Arc::new(service);
        let record = service.request_reset(EMAIL).await.unwrap();

        let handles: Vec<_> = ["first-new", "second-new"]
            .into_iter()
            .map(|password| {
                let service = Arc::clone(&service);
                let token = record.token.clone();
                tokio::spawn(async move {
                    service
                        .redeem_and_update(EMAIL, &token, password)
                        .await
                        .map(|_| password)
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(password) => winners.push(password),
                Err(e) => assert!(matches!(e, AuthError::InvalidOrExpiredResetToken)),
            }
        }
        assert_eq!(winners.len(), 1);
        assert!(service.sign_in(EMAIL, winners[0]).await.is_ok());
        assert!(service.store().resets_for(1).await.is_empty());
    }

    /// 兑换写入总是失败的存储，其余操作委托给内存存储
    #[derive(Debug, Clone)]
    struct FailingRedeemStore(MemoryStore);

    impl CredentialStore for FailingRedeemStore {
        async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<Account>> {
            self.0.find_by_login(identifier).await
        }
        async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
            self.0.find_by_id(id).await
        }
        async fn update_password(
            &self,
            id: i64,
            hash: &str,
            at: DateTime<Utc>,
        ) -> StoreResult<bool> {
            self.0.update_password(id, hash, at).await
        }
    }

    impl ResetTokenStore for FailingRedeemStore {
        async fn insert_reset(&self, record: NewResetPassword) -> StoreResult<ResetPasswordRecord> {
            self.0.insert_reset(record).await
        }
        async fn find_valid_reset(
            &self,
            email: &str,
            token: &str,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<ResetPasswordRecord>> {
            self.0.find_valid_reset(email, token, now).await
        }
        async fn find_reset_by_token(
            &self,
            token: &str,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<ResetPasswordRecord>> {
            self.0.find_reset_by_token(token, now).await
        }
        async fn redeem_reset(
            &self,
            _: i64,
            _: i64,
            _: &str,
            _: DateTime<Utc>,
        ) -> StoreResult<bool> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
        async fn purge_expired_resets(&self, now: DateTime<Utc>) -> StoreResult<u64> {
            self.0.purge_expired_resets(now).await
        }
    }

    #[tokio::test]
    async fn failed_redeem_leaves_password_and_token_intact() {
        let (inner, _) = service().await;
        let store = FailingRedeemStore(inner.store().clone());
        let config = AuthConfig::new("test-secret").unwrap();
        let service = AuthService::with_hasher(store, BcryptHasher::new(4), config)
            .with_clock(Arc::new(ManualClock::new(t0())));

        let record = service.request_reset(EMAIL).await.unwrap();
        let err = service
            .redeem_and_update(EMAIL, &record.token, "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Persistence(StoreError::Unavailable(_))));

        assert!(service.sign_in(EMAIL, "old-password").await.is_ok());
        assert!(service.sign_in(EMAIL, "new-password").await.is_err());
        assert_eq!(service.email_for_reset_token(&record.token).await.unwrap(), EMAIL);
    }

    #[tokio::test]
    async fn unrepresentable_reset_expiry_is_an_error() {
        let (inner, _) = service().await;
        let config = AuthConfig::new("test-secret")
            .unwrap()
            .with_reset_ttl(i64::MAX / 1000);
        let service = AuthService::with_hasher(inner.store().clone(), BcryptHasher::new(4), config)
            .with_clock(Arc::new(ManualClock::new(t0())));

        let err = service.request_reset(EMAIL).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidDuration(_)));
        assert!(service.store().resets_for(1).await.is_empty());
    }
}
