//! 认证与凭证生命周期：登录、token 编解码、刷新、重置密码

mod crypto;
mod models;
mod notify;
mod reset;
mod service;
mod session;
mod token;

pub use crypto::{BcryptHasher, PasswordHasher};
pub use models::{
    Account, AccountProfile, AuthUser, NewResetPassword, RefreshRequest, ResetPasswordRecord,
    ResetPasswordRequest, SessionClaims, SignInRequest, TokenPayload, UpdatePasswordRequest,
};
pub use notify::{LogNotifier, ResetNotifier};
pub use reset::{generate_reset_token, RESET_TOKEN_BYTES};
pub use service::AuthService;
pub use token::TokenCodec;
