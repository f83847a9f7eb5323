use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

/// Process-wide authentication state for the dashboard surfaces.
///
/// Initialized on login, torn down on logout or on the first 401 any
/// request observes. The booking wizard itself never reads the token; it
/// only ever needs the opaque `is_authenticated` capability, and the public
/// flow works with no session at all.
#[derive(Clone, Default)]
pub struct AuthSession {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn login(&self, token: impl Into<String>) {
        let mut guard = self.token.write().await;
        *guard = Some(token.into());
        info!("auth session initialized");
    }

    pub async fn logout(&self) {
        let mut guard = self.token.write().await;
        if guard.take().is_some() {
            info!("auth session torn down on logout");
        }
    }

    /// Teardown path for a server-side session invalidation.
    pub async fn on_unauthorized(&self) {
        let mut guard = self.token.write().await;
        if guard.take().is_some() {
            info!("auth session torn down after 401");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn bearer_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}
