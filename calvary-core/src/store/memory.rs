//! 内存存储：测试与本地开发用

use super::{CredentialStore, ResetTokenStore, StoreResult};
use crate::auth::{Account, NewResetPassword, ResetPasswordRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: Vec<Account>,
    resets: Vec<ResetPasswordRecord>,
    next_reset_id: i64,
}

impl MemoryState {
    /// 最新优先：created_at 相同时按 id 倒序
    fn latest_reset<F>(&self, now: DateTime<Utc>, mut matches: F) -> Option<ResetPasswordRecord>
    where
        F: FnMut(&ResetPasswordRecord) -> bool,
    {
        self.resets
            .iter()
            .filter(|r| r.is_valid_at(now) && matches(r))
            .max_by_key(|r| (r.created_at, r.id))
            .cloned()
    }
}

/// 克隆共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或替换账户（按 id）
    pub async fn put_account(&self, account: Account) {
        let mut state = self.state.write().await;
        state.accounts.retain(|a| a.id != account.id);
        state.accounts.push(account);
    }

    pub async fn account(&self, id: i64) -> Option<Account> {
        let state = self.state.read().await;
        state.accounts.iter().find(|a| a.id == id).cloned()
    }

    /// 某账户的全部重置记录（含已过期）
    pub async fn resets_for(&self, user_id: i64) -> Vec<ResetPasswordRecord> {
        let state = self.state.read().await;
        state
            .resets
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl CredentialStore for MemoryStore {
    async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        let by_email = state.accounts.iter().find(|a| a.email == identifier);
        Ok(by_email
            .or_else(|| state.accounts.iter().find(|a| a.username == identifier))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl ResetTokenStore for MemoryStore {
    async fn insert_reset(&self, record: NewResetPassword) -> StoreResult<ResetPasswordRecord> {
        let mut state = self.state.write().await;
        state.next_reset_id += 1;
        let stored = ResetPasswordRecord {
            id: state.next_reset_id,
            user_id: record.user_id,
            token: record.token,
            expires_at: record.expires_at,
            created_at: record.created_at,
        };
        state.resets.push(stored.clone());
        Ok(stored)
    }

    async fn find_valid_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetPasswordRecord>> {
        let state = self.state.read().await;
        let Some(user_id) = state
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.id)
        else {
            return Ok(None);
        };
        Ok(state.latest_reset(now, |r| r.user_id == user_id && r.token == token))
    }

    async fn find_reset_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetPasswordRecord>> {
        let state = self.state.read().await;
        Ok(state.latest_reset(now, |r| r.token == token))
    }

    async fn redeem_reset(
        &self,
        id: i64,
        user_id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // 整个检查与写入都在同一把写锁内完成
        let mut state = self.state.write().await;
        let Some(pos) = state.resets.iter().position(|r| {
            r.id == id && r.user_id == user_id && r.is_valid_at(updated_at)
        }) else {
            return Ok(false);
        };
        let Some(account) = state.accounts.iter_mut().find(|a| a.id == user_id) else {
            return Ok(false);
        };
        account.password_hash = password_hash.to_string();
        account.updated_at = updated_at;
        state.resets.remove(pos);
        Ok(true)
    }

    async fn purge_expired_resets(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.resets.len();
        state.resets.retain(|r| r.is_valid_at(now));
        Ok((before - state.resets.len()) as u64)
    }
}
