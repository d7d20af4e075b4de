//! JWT 编解码：HS256，签名校验先于任何 claim 读取

use super::models::{SessionClaims, TokenPayload};
use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;

/// 绑定共享密钥与 issuer 的 token 编解码器
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        // 过期由 decode 的调用方时间判断，不走库内的系统时钟
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Self {
            issuer,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// 编码 claims；相同 claims 与密钥得到相同字符串
    pub fn encode(&self, claims: &SessionClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Other(format!("jwt encode failed: {}", e)))
    }

    /// 解码并校验 token，`now` 之后（含）到期的视为过期
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::Integrity,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Format(e.to_string()),
            },
        )?;

        let claims = data.claims;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// 为 username 签发有效期为 `ttl` 的 token
    pub fn issue(&self, username: &str, ttl: Duration, now: DateTime<Utc>) -> Result<TokenPayload> {
        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidDuration(ttl.num_seconds()));
        }

        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::InvalidDuration(ttl.num_seconds()))?;
        let claims = SessionClaims {
            username: username.to_string(),
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
        };
        let token = self.encode(&claims)?;

        Ok(TokenPayload {
            username: claims.username,
            token,
            iss: claims.iss,
            exp: claims.exp,
        })
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
