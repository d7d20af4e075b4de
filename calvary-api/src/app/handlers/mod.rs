mod auth;
mod health;

pub use auth::{
    email_for_reset_token, refresh_token, reset_password, session, sign_in, update_password,
};
pub use health::{handler_404, health};
