//! JWT 认证：登录、刷新、验证、签发 token

use super::crypto::PasswordHasher;
use super::models::*;
use super::AuthService;
use crate::error::{AuthError, Result};
use crate::store::CredentialStore;
use chrono::Duration;
use tracing::{info, instrument, warn};

impl<S: CredentialStore, H: PasswordHasher> AuthService<S, H> {
    /// 用户登录（邮箱或用户名）
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<AuthUser> {
        let account = self
            .bounded("find_by_login", self.store.find_by_login(identifier))
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !account.is_exist {
            warn!(user_id = account.id, "sign-in rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        let valid = self
            .hasher
            .verify(&account.password_hash, password)
            .await?;
        if !valid {
            warn!(user_id = account.id, "sign-in rejected: invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.now();
        let access_token =
            self.codec
                .issue(&account.username, self.config.access_token_ttl(), now)?;
        let refresh_token =
            self.codec
                .issue(&account.username, self.config.refresh_token_ttl(), now)?;

        info!(user_id = account.id, username = %account.username, "user signed in");
        Ok(AuthUser {
            user: account.into(),
            access_token,
            refresh_token,
        })
    }
}

impl<S, H> AuthService<S, H> {
    /// 用 refresh token 换新的 access token；refresh token 本身不轮换
    #[instrument(skip(self, refresh_token))]
    pub fn refresh(
        &self,
        username: &str,
        refresh_token: &str,
        duration: Duration,
    ) -> Result<TokenPayload> {
        let now = self.now();
        let claims = self.codec.decode(refresh_token, now).map_err(|e| match e {
            AuthError::Format(_) | AuthError::Integrity | AuthError::Expired => {
                AuthError::InvalidRefreshToken(e.to_string())
            }
            other => other,
        })?;

        // 防止用他人的 refresh token 为任意用户名签发 access token
        if claims.username != username {
            warn!(claimed = %username, subject = %claims.username, "refresh subject mismatch");
            return Err(AuthError::InvalidRefreshToken("subject mismatch".into()));
        }

        let payload = self.codec.issue(username, duration, now)?;
        info!(username = %username, "access token refreshed");
        Ok(payload)
    }

    /// 以配置的 access 有效期刷新
    pub fn refresh_access(&self, username: &str, refresh_token: &str) -> Result<TokenPayload> {
        self.refresh(username, refresh_token, self.config.access_token_ttl())
    }

    /// 签发任意有效期的 token
    pub fn generate_token(&self, username: &str, duration: Duration) -> Result<TokenPayload> {
        self.codec.issue(username, duration, self.now())
    }

    /// 验证 JWT token
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims> {
        self.codec.decode(token, self.now())
    }
}
