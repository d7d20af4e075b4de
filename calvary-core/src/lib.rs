//! Core library for the admin system's authentication: password verification,
//! session tokens, refresh, and password reset.

pub mod auth;
mod clock;
mod config;
mod error;
pub mod store;

pub use auth::{
    Account, AccountProfile, AuthService, AuthUser, BcryptHasher, PasswordHasher, RefreshRequest,
    ResetPasswordRequest, SessionClaims, SignInRequest, TokenCodec, TokenPayload,
    UpdatePasswordRequest,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AuthConfig, DEFAULT_ACCESS_TTL_SECS, DEFAULT_ISSUER, DEFAULT_REFRESH_TTL_SECS,
    DEFAULT_RESET_TTL_SECS, DEFAULT_STORE_TIMEOUT, MAX_TTL_SECS,
};
pub use error::{AuthError, Result, StoreError};
pub use store::{AuthStore, CredentialStore, MemoryStore, PgStore, PgStoreConfig, ResetTokenStore};
