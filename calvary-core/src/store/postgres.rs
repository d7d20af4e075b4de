//! PostgreSQL 存储：`users` 与 `reset_passwords` 两张表

use super::{CredentialStore, ResetTokenStore, StoreResult};
use crate::auth::{Account, NewResetPassword, ResetPasswordRecord};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::info;

const ACCOUNT_COLUMNS: &str = "id, username, email, password, role, is_exist, is_verified, \
     verify_token, verify_token_expires, created_at, updated_at";

const RESET_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS reset_passwords (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        token TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
";

/// 连接池配置
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/calvary".into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    role: String,
    is_exist: bool,
    is_verified: bool,
    verify_token: Option<String>,
    verify_token_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password,
            role: row.role,
            is_exist: row.is_exist,
            is_verified: row.is_verified,
            verify_token: row.verify_token,
            verify_token_expires: row.verify_token_expires,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ResetRow {
    id: i64,
    user_id: i64,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ResetRow> for ResetPasswordRecord {
    fn from(row: ResetRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// 基于连接池的存储；池的并发上限即同时进行的认证操作上限
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &PgStoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "postgres pool opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 创建 reset_passwords 表（users 表由用户服务维护）
    pub async fn ensure_reset_table(&self) -> StoreResult<()> {
        sqlx::query(RESET_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_account(&self, filter: &str, value: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {filter} LIMIT 1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }
}

impl CredentialStore for PgStore {
    async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<Account>> {
        self.fetch_account(
            "email = $1 OR username = $1 ORDER BY (email = $1) DESC",
            identifier,
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.fetch_account("email = $1", email).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let affected = sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

impl ResetTokenStore for PgStore {
    async fn insert_reset(&self, record: NewResetPassword) -> StoreResult<ResetPasswordRecord> {
        let row = sqlx::query_as::<_, ResetRow>(
            r"
            INSERT INTO reset_passwords (user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token, expires_at, created_at
            ",
        )
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_valid_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetPasswordRecord>> {
        let row = sqlx::query_as::<_, ResetRow>(
            r"
            SELECT r.id, r.user_id, r.token, r.expires_at, r.created_at
            FROM reset_passwords r
            JOIN users u ON u.id = r.user_id
            WHERE u.email = $1 AND r.token = $2 AND r.expires_at > $3
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT 1
            ",
        )
        .bind(email)
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_reset_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetPasswordRecord>> {
        let row = sqlx::query_as::<_, ResetRow>(
            r"
            SELECT id, user_id, token, expires_at, created_at
            FROM reset_passwords
            WHERE token = $1 AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn redeem_reset(
        &self,
        id: i64,
        user_id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // 未 commit 的事务在 drop 时回滚
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "DELETE FROM reset_passwords WHERE id = $1 AND user_id = $2 AND expires_at > $3",
        )
        .bind(id)
        .bind(user_id)
        .bind(updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if claimed == 0 {
            return Ok(false);
        }

        let updated = sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(updated_at)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn purge_expired_resets(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let affected = sqlx::query("DELETE FROM reset_passwords WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}
