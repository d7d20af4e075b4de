//! 重置密码通知（邮件发送不在本服务内，默认只记录日志）

use super::models::Account;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use tracing::info;

pub trait ResetNotifier: Debug + Send + Sync {
    fn reset_requested(&self, account: &Account, token: &str, expires_at: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
    fn reset_requested(&self, account: &Account, _token: &str, expires_at: DateTime<Utc>) {
        info!(
            user_id = account.id,
            email = %account.email,
            expires_at = %expires_at,
            "password reset requested; email dispatch is handled externally"
        );
    }
}
