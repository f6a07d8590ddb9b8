// Identity port - who is behind a bearer credential, and how does a user get one?
//
// The core never looks inside credentials. An auth provider in the infra layer
// answers with the caller's user id, which doubles as the billing subscriber id.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Credential rejected by the auth provider")]
    Unauthorized,

    #[error("Auth provider returned a user without an id")]
    MissingUserId,

    /// Sign-up or sign-in refused. Carries the provider's own message.
    #[error("{0}")]
    Rejected(String),

    #[error("Auth provider unavailable: {0}")]
    Unavailable(String),
}

/// The caller, as vouched for by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
}

/// Result of a sign-up or sign-in. `access_token` is absent when the provider
/// created the account but withheld a session (email confirmation pending).
/// `user` is the provider's user object, relayed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub user: Option<serde_json::Value>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, bearer_token: &str) -> Result<AuthenticatedUser, IdentityError>;
}

/// Email/password accounts.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;
}

/// Create an account and try to hand back a usable session.
///
/// When sign-up returns no session, a password sign-in is attempted. If that is
/// refused too (typically because the email is unconfirmed), the new user is
/// still returned, just without a token.
pub async fn register(
    accounts: &dyn AccountProvider,
    email: &str,
    password: &str,
) -> Result<AuthSession, IdentityError> {
    let session = accounts.sign_up(email, password).await?;
    if session.access_token.is_some() {
        return Ok(session);
    }

    match accounts.sign_in(email, password).await {
        Ok(signed_in) => Ok(AuthSession {
            access_token: signed_in.access_token,
            user: signed_in.user.or(session.user),
        }),
        Err(e) => {
            tracing::debug!("Sign-in after sign-up failed: {}", e);
            Ok(session)
        }
    }
}
