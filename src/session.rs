// Session state: signed-in user, token source and connector flags.
// Passed explicitly to everything that needs it; created at sign-in, cleared at sign-out.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::backend_repo::{BackendRepo, FetchError};
use crate::models::{ConnectorStatus, Provider};

/// Yields a bearer token from the identity provider on demand.
pub trait TokenSource: Send + Sync {
    fn id_token(&self) -> BoxFuture<'_, Option<String>>;
}

/// Token handed over once (e.g. via environment) and reused for every request.
#[derive(Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// Reads the token from `var`; empty or unset means no token.
    pub fn from_env(var: &str) -> Self {
        Self(std::env::var(var).ok().filter(|t| !t.trim().is_empty()))
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

impl TokenSource for StaticToken {
    fn id_token(&self) -> BoxFuture<'_, Option<String>> {
        let token = self.0.clone();
        async move { token }.boxed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub uid: String,
    pub display_name: Option<String>,
}

pub struct Session {
    tokens: Arc<dyn TokenSource>,
    user: RwLock<Option<UserInfo>>,
    connectors: RwLock<ConnectorStatus>,
}

impl Session {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            tokens,
            user: RwLock::new(None),
            connectors: RwLock::new(ConnectorStatus::default()),
        }
    }

    pub async fn start(&self, user: UserInfo) {
        tracing::info!(uid = %user.uid, "session started");
        *self.user.write().await = Some(user);
    }

    /// Starts a session for `user` and loads its connector flags from the backend.
    /// Fails only when the identity provider has no token; a failed status lookup is logged
    /// and leaves both connectors off.
    pub async fn sign_in(
        &self,
        repo: &BackendRepo,
        user: UserInfo,
    ) -> Result<ConnectorStatus, FetchError> {
        let token = self
            .tokens
            .id_token()
            .await
            .ok_or(FetchError::Unauthenticated)?;
        self.start(user).await;
        let status = match repo.connector_status(&token).await {
            Ok(status) => {
                tracing::info!(aws = status.aws, azure = status.azure, "connector status");
                status
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "connector_status",
                    "connector status unavailable; treating both as disconnected"
                );
                ConnectorStatus::default()
            }
        };
        self.set_connectors(status).await;
        Ok(status)
    }

    /// Drops the user and resets both connectors.
    pub async fn sign_out(&self) {
        *self.user.write().await = None;
        *self.connectors.write().await = ConnectorStatus::default();
        tracing::info!("session signed out");
    }

    pub async fn user(&self) -> Option<UserInfo> {
        self.user.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Bearer token for backend calls; None without a signed-in user.
    pub async fn token(&self) -> Option<String> {
        if !self.is_signed_in().await {
            return None;
        }
        self.tokens.id_token().await
    }

    pub async fn connectors(&self) -> ConnectorStatus {
        *self.connectors.read().await
    }

    pub async fn set_connectors(&self, status: ConnectorStatus) {
        *self.connectors.write().await = status;
    }

    pub async fn set_connector(&self, provider: Provider, connected: bool) {
        self.connectors.write().await.set(provider, connected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_requires_signed_in_user() {
        let session = Session::new(Arc::new(StaticToken::new("t0k")));
        assert_eq!(session.token().await, None);
        session
            .start(UserInfo {
                uid: "u1".into(),
                display_name: None,
            })
            .await;
        assert_eq!(session.token().await.as_deref(), Some("t0k"));
    }

    #[tokio::test]
    async fn sign_out_resets_connectors() {
        let session = Session::new(Arc::new(StaticToken::none()));
        session
            .start(UserInfo {
                uid: "u1".into(),
                display_name: Some("Ada".into()),
            })
            .await;
        session.set_connector(Provider::Aws, true).await;
        assert!(session.connectors().await.aws);
        session.sign_out().await;
        assert!(!session.is_signed_in().await);
        assert_eq!(session.connectors().await, ConnectorStatus::default());
    }
}
