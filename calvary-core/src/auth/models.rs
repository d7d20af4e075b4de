//! 认证数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// 用户账户（存储模型，包含密码哈希）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// bcrypt 哈希后的密码
    pub password_hash: String,
    pub role: String,
    /// 账户是否仍然有效（false 时禁止登录）
    pub is_exist: bool,
    pub is_verified: bool,
    pub verify_token: Option<String>,
    pub verify_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 对外的账户视图（不含密码哈希与验证 token）
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_exist: bool,
    pub is_verified: bool,
    pub verify_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            role: account.role,
            is_exist: account.is_exist,
            is_verified: account.is_verified,
            verify_token_expires: account.verify_token_expires,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// JWT Claims 结构（未知字段在解码时直接拒绝）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    /// Subject: 用户名
    pub username: String,
    /// JWT issuer
    pub iss: String,
    /// 过期时间戳 (Unix timestamp)
    pub exp: i64,
}

/// 单个 token 的签发结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub username: String,
    pub token: String,
    pub iss: String,
    pub exp: i64,
}

/// 登录响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user: AccountProfile,
    pub access_token: TokenPayload,
    pub refresh_token: TokenPayload,
}

/// 登录请求（邮箱或用户名均可）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
}

/// 刷新请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub username: String,
    pub refresh_token: String,
}

/// 申请重置密码
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// 使用重置 token 更新密码
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

/// 重置密码记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetPasswordRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 待写入的重置密码记录
#[derive(Debug, Clone)]
pub struct NewResetPassword {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
