// What callers see. Every failure maps to a status code and a short error tag;
// internal detail (upstream messages, moderation policy) stays in the logs.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::identity::IdentityError;

/// Status + JSON body, ready for whatever HTTP framework sits in front.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("missing_app_user_id")]
    MissingAppUserId,

    #[error("email_and_password_required")]
    EmailAndPasswordRequired,

    /// The auth provider's message, passed through.
    #[error("{0}")]
    SignupRejected(String),

    #[error("{0}")]
    LoginRejected(String),

    /// Categories are only filled in when category exposure is switched on.
    #[error("blocked")]
    Blocked {
        categories: Option<BTreeMap<String, bool>>,
    },

    /// Entitlement state is unknown right now. Retryable, and never the same as "inactive".
    #[error("entitlement_unavailable")]
    EntitlementUnavailable,

    #[error("revenuecat_error")]
    Upstream,

    #[error("internal_error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::LoginRejected(_) => StatusCode::UNAUTHORIZED,
            ApiError::MissingAppUserId
            | ApiError::EmailAndPasswordRequired
            | ApiError::SignupRejected(_)
            | ApiError::Blocked { .. } => StatusCode::BAD_REQUEST,
            ApiError::EntitlementUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });

        if let ApiError::Blocked {
            categories: Some(categories),
        } = self
        {
            body["categories"] = json!(categories);
        }

        ApiResponse { status, body }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthorized | IdentityError::Rejected(_) => ApiError::Unauthorized,
            IdentityError::MissingUserId => ApiError::MissingAppUserId,
            IdentityError::Unavailable(reason) => {
                tracing::error!("Identity lookup failed: {}", reason);
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_hides_categories_by_default() {
        let response = ApiError::Blocked { categories: None }.into_response();

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, json!({ "error": "blocked" }));
    }

    #[test]
    fn blocked_can_expose_categories() {
        let mut categories = BTreeMap::new();
        categories.insert("policy".to_string(), true);

        let response = ApiError::Blocked {
            categories: Some(categories),
        }
        .into_response();

        assert_eq!(
            response.body,
            json!({ "error": "blocked", "categories": { "policy": true } })
        );
    }

    #[test]
    fn entitlement_failure_is_distinguishable() {
        let response = ApiError::EntitlementUnavailable.into_response();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body["error"], "entitlement_unavailable");
    }

    #[test]
    fn account_rejections_relay_the_provider_message() {
        let signup = ApiError::SignupRejected("User already registered".to_string());
        let login = ApiError::LoginRejected("Invalid login credentials".to_string());
        let (signup, login) = (signup.into_response(), login.into_response());

        assert_eq!(signup.status, StatusCode::BAD_REQUEST);
        assert_eq!(signup.body, json!({ "error": "User already registered" }));
        assert_eq!(login.status, StatusCode::UNAUTHORIZED);
        assert_eq!(login.body, json!({ "error": "Invalid login credentials" }));
    }

    #[test]
    fn identity_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(IdentityError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(IdentityError::MissingUserId).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(IdentityError::Unavailable("dns".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
