use calvary_core::AuthService;
use std::sync::Arc;

/// Shared application state for handlers.
pub struct AppState<S> {
    pub auth: Arc<AuthService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
        }
    }
}
