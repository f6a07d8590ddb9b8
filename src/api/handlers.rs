// Request handlers.
//
// **Notice the pattern:**
// 1. Pull the bearer credential out of the Authorization header
// 2. Call the core service
// 3. Turn the result into an ApiResponse or ApiError
//
// This layer is THIN - no business logic, just translation.

use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiResponse};
use crate::core::entitlements::{EntitlementService, SubscriptionProvider, DEFAULT_ENTITLEMENT};
use crate::core::identity::{self, AccountProvider, IdentityError, IdentityProvider};
use crate::core::moderation::{Classifier, ModerationContext, ModerationGate};

pub const COACH_GREETING: &str = "Hello from coach...";

/// Body of a coach request. Only the prompt is moderated; the ids are what
/// gets logged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub prompt_id: Option<String>,
}

impl CoachRequest {
    fn context(&self) -> ModerationContext {
        ModerationContext {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            prompt_id: self.prompt_id.clone(),
        }
    }
}

/// Email/password body for sign-up and login. Blank counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    fn required(&self) -> Result<(&str, &str), ApiError> {
        let email = self.email.as_deref().filter(|email| !email.is_empty());
        let password = self.password.as_deref().filter(|password| !password.is_empty());

        email.zip(password).ok_or(ApiError::EmailAndPasswordRequired)
    }
}

/// `Authorization: Bearer <token>` -> `<token>`. Anything else is unauthorized.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, ApiError> {
    authorization
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)
}

pub fn health() -> ApiResponse {
    ApiResponse::ok(json!({ "ok": true }))
}

/// Create an account. 201 with `{access_token, user}`; the token is null when
/// the account still needs email confirmation.
pub async fn signup(
    accounts: &dyn AccountProvider,
    credentials: Credentials,
) -> Result<ApiResponse, ApiError> {
    let (email, password) = credentials.required()?;

    let session = identity::register(accounts, email, password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(message) => ApiError::SignupRejected(message),
            other => ApiError::from(other),
        })?;

    Ok(ApiResponse::created(json!(session)))
}

/// Password sign-in. 200 with `{access_token, user}`.
pub async fn login(
    accounts: &dyn AccountProvider,
    credentials: Credentials,
) -> Result<ApiResponse, ApiError> {
    let (email, password) = credentials.required()?;

    let session = accounts
        .sign_in(email, password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(message) => ApiError::LoginRejected(message),
            other => ApiError::from(other),
        })?;

    Ok(ApiResponse::ok(json!(session)))
}

/// Is the caller's entitlement `key` (default "premium") active?
pub async fn check_entitlement<P: SubscriptionProvider>(
    identity: &dyn IdentityProvider,
    entitlements: &EntitlementService<P>,
    authorization: Option<&str>,
    key: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    let token = bearer_token(authorization)?;
    let user = identity.authenticate(token).await?;
    let key = key.unwrap_or(DEFAULT_ENTITLEMENT);

    let active = entitlements
        .resolve(&user.id, key)
        .await
        .map_err(|e| {
            tracing::warn!(
                user_id = %user.id,
                entitlement = key,
                "Entitlement check failed: {}",
                e
            );
            ApiError::EntitlementUnavailable
        })?;

    Ok(ApiResponse::ok(json!({ "key": key, "active": active })))
}

/// Relay the caller's purchase offerings unchanged.
pub async fn offerings<P: SubscriptionProvider>(
    identity: &dyn IdentityProvider,
    entitlements: &EntitlementService<P>,
    authorization: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    let token = bearer_token(authorization)?;
    let user = identity.authenticate(token).await?;

    let offerings = entitlements.offerings(&user.id).await.map_err(|e| {
        tracing::warn!(user_id = %user.id, "Offerings fetch failed: {}", e);
        ApiError::Upstream
    })?;

    Ok(ApiResponse::ok(offerings))
}

/// Moderate the prompt before it goes anywhere near the coach.
///
/// Only a bearer credential's presence is checked here.
pub async fn coach<R: Classifier>(
    gate: &ModerationGate<R>,
    expose_categories: bool,
    authorization: Option<&str>,
    request: CoachRequest,
) -> Result<ApiResponse, ApiError> {
    bearer_token(authorization)?;

    let prompt = request.prompt.as_deref().unwrap_or_default();
    let decision = gate.decide(prompt).await;

    if !decision.allowed {
        // IDs only, never the prompt
        let context = request.context();
        tracing::info!(
            user_id = ?context.user_id,
            session_id = ?context.session_id,
            prompt_id = ?context.prompt_id,
            source = ?decision.source,
            "moderation_block"
        );
        return Err(ApiError::Blocked {
            categories: expose_categories.then_some(decision.categories),
        });
    }

    Ok(ApiResponse::ok(json!({ "chunk": COACH_GREETING })))
}
