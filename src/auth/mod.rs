//! Sign-in state for the editor.
//!
//! The session lives in an explicit [`SessionHandle`] that is created once and
//! passed to whatever needs the bearer token. It is populated by signing in,
//! cleared on sign-out and refreshed when the API answers `401`.

mod cognito;

pub use cognito::{region_from_pool_id, CognitoIdentity};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Tokens of a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    /// Sent as the bearer token on API requests.
    pub id_token: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    SignedIn(Session),
    /// The provider needs another step (new password, MFA, ...) before it
    /// issues tokens.
    Challenge { name: String },
}

/// Hosted identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInOutcome, AuthError>;

    /// Exchanges the session's refresh token for fresh tokens.
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Credentials as typed on the login prompt.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::InvalidInput("Username is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(
                "Password must be at least 8 characters",
            ));
        }
        Ok(())
    }
}

/// Shared slot holding the current session, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    /// The token to present as `Authorization: Bearer`, if signed in.
    pub async fn bearer_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|session| session.id_token.clone())
    }

    pub async fn set(&self, session: Session) {
        *self.inner.write().await = Some(session);
    }

    pub async fn clear(&self) -> Option<Session> {
        self.inner.write().await.take()
    }
}

/// Identity collaborator as seen by the editor: a provider plus the session
/// it produced.
#[derive(Clone)]
pub struct Auth {
    provider: Arc<dyn IdentityProvider>,
    session: SessionHandle,
}

impl Auth {
    pub fn new(provider: Arc<dyn IdentityProvider>, session: SessionHandle) -> Self {
        Self { provider, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn sign_in(&self, form: &LoginForm) -> Result<SignInOutcome, AuthError> {
        form.validate()?;
        // A previous user's tokens must not survive a new sign-in attempt.
        self.sign_out().await;

        let outcome = self
            .provider
            .sign_in(form.username.trim(), &form.password)
            .await?;
        match &outcome {
            SignInOutcome::SignedIn(session) => {
                info!(username = %session.username, "Signed in");
                self.session.set(session.clone()).await;
            }
            SignInOutcome::Challenge { name } => {
                warn!(challenge = %name, "Sign-in needs an additional step");
            }
        }
        Ok(outcome)
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.session.current().await
    }

    /// Forgets the local session first, then tells the provider. A provider
    /// failure is logged and otherwise ignored.
    pub async fn sign_out(&self) {
        if let Some(session) = self.session.clear().await {
            if let Err(e) = self.provider.sign_out(&session).await {
                warn!("Provider sign-out failed: {e}");
            }
            info!(username = %session.username, "Signed out");
        }
    }

    /// Called after the API rejected the current token. On failure the
    /// session is dropped and the caller has to sign in again.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let current = self.session.current().await.ok_or(AuthError::NotSignedIn)?;
        match self.provider.refresh(&current).await {
            Ok(session) => {
                self.session.set(session.clone()).await;
                info!(username = %session.username, "Session refreshed");
                Ok(session)
            }
            Err(e) => {
                warn!("Session refresh failed: {e}");
                self.session.clear().await;
                Err(AuthError::NotSignedIn)
            }
        }
    }
}
