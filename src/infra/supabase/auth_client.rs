use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::identity::{
    AccountProvider, AuthSession, AuthenticatedUser, IdentityError, IdentityProvider,
};

pub const DEFAULT_EMAIL_REDIRECT_URL: &str = "http://localhost:3000/auth/confirm";

/// Supabase GoTrue client. Turns user access tokens into user ids, and signs
/// users up or in with email and password.
pub struct SupabaseAuthClient {
    client: Client,
    auth_url: String,
    email_redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Option<String>,
}

impl SupabaseAuthClient {
    pub fn new(
        supabase_url: &str,
        anon_key: &str,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key).map_err(|e| IdentityError::Unavailable(e.to_string()))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            email_redirect_url: DEFAULT_EMAIL_REDIRECT_URL.to_string(),
        })
    }

    /// Where confirmation emails send the user.
    pub fn with_email_redirect(mut self, url: impl Into<String>) -> Self {
        self.email_redirect_url = url.into();
        self
    }

    fn map_user(api: ApiUser) -> Result<AuthenticatedUser, IdentityError> {
        match api.id {
            Some(id) if !id.is_empty() => Ok(AuthenticatedUser { id }),
            _ => Err(IdentityError::MissingUserId),
        }
    }

    async fn post_credentials(
        &self,
        url: &str,
        query: &[(&str, &str)],
        email: &str,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let resp = self
            .client
            .post(url)
            .query(query)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(account_error(status, &body));
        }
        parse_session(&body)
    }
}

/// `GET /user`: a rejected token is the caller's problem, anything else non-2xx is ours.
fn check_user_status(status: StatusCode) -> Result<(), IdentityError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Unauthorized),
        status if !status.is_success() => Err(IdentityError::Unavailable(format!(
            "Supabase returned {} for auth user",
            status
        ))),
        _ => Ok(()),
    }
}

/// Sign-up/sign-in failures. 4xx carries a message meant for the user; GoTrue
/// puts it under one of several keys depending on the endpoint and version.
fn account_error(status: StatusCode, body: &str) -> IdentityError {
    if !status.is_client_error() {
        return IdentityError::Unavailable(format!("Supabase returned {}", status));
    }

    let message = serde_json::from_str::<Value>(body).ok().and_then(|error| {
        ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| error.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    IdentityError::Rejected(message.unwrap_or_else(|| format!("Supabase returned {}", status)))
}

/// Either a session (`access_token` + `user`) or, when email confirmation is
/// required, the bare user object.
fn parse_session(body: &str) -> Result<AuthSession, IdentityError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| IdentityError::Unavailable(format!("malformed auth body: {}", e)))?;

    let access_token = document
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string);

    let nested_user = document.get("user").filter(|user| !user.is_null()).cloned();
    let user = match nested_user {
        Some(user) => Some(user),
        None if document.get("id").is_some() => Some(document),
        None => None,
    };

    Ok(AuthSession { access_token, user })
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn authenticate(&self, bearer_token: &str) -> Result<AuthenticatedUser, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/user", self.auth_url))
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        check_user_status(resp.status())?;

        let user: ApiUser = resp
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Self::map_user(user)
    }
}

#[async_trait]
impl AccountProvider for SupabaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let url = format!("{}/signup", self.auth_url);
        let query = [("redirect_to", self.email_redirect_url.as_str())];
        self.post_credentials(&url, &query, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let url = format!("{}/token", self.auth_url);
        self.post_credentials(&url, &[("grant_type", "password")], email, password)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_url_is_built_from_project_url() {
        let client =
            SupabaseAuthClient::new("https://abc.supabase.co/", "anon", Duration::from_secs(5))
                .unwrap();

        assert_eq!(client.auth_url, "https://abc.supabase.co/auth/v1");
        assert_eq!(client.email_redirect_url, DEFAULT_EMAIL_REDIRECT_URL);

        let client = client.with_email_redirect("https://app.example.test/confirm");
        assert_eq!(client.email_redirect_url, "https://app.example.test/confirm");
    }

    #[test]
    fn user_without_id_is_rejected() {
        let blank = ApiUser {
            id: Some(String::new()),
        };
        let missing: ApiUser = serde_json::from_str(r#"{"email": "a@example.test"}"#).unwrap();

        assert!(matches!(
            SupabaseAuthClient::map_user(blank),
            Err(IdentityError::MissingUserId)
        ));
        assert!(matches!(
            SupabaseAuthClient::map_user(missing),
            Err(IdentityError::MissingUserId)
        ));
    }

    #[test]
    fn user_with_id_is_accepted() {
        let user: ApiUser = serde_json::from_str(
            r#"{"id": "6f1c", "email": "a@example.test", "role": "authenticated"}"#,
        )
        .unwrap();

        assert_eq!(
            SupabaseAuthClient::map_user(user).unwrap(),
            AuthenticatedUser {
                id: "6f1c".to_string(),
            }
        );
    }

    #[test]
    fn user_status_mapping() {
        assert!(check_user_status(StatusCode::OK).is_ok());
        assert!(matches!(
            check_user_status(StatusCode::UNAUTHORIZED),
            Err(IdentityError::Unauthorized)
        ));
        assert!(matches!(
            check_user_status(StatusCode::FORBIDDEN),
            Err(IdentityError::Unauthorized)
        ));
        assert!(matches!(
            check_user_status(StatusCode::NOT_FOUND),
            Err(IdentityError::Unavailable(_))
        ));
        assert!(matches!(
            check_user_status(StatusCode::BAD_GATEWAY),
            Err(IdentityError::Unavailable(_))
        ));
    }

    #[test]
    fn account_errors_carry_the_provider_message() {
        let rejected = account_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#,
        );
        assert!(
            matches!(rejected, IdentityError::Rejected(ref m) if m == "Invalid login credentials")
        );

        let rejected = account_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code": 422, "msg": "User already registered"}"#,
        );
        assert!(
            matches!(rejected, IdentityError::Rejected(ref m) if m == "User already registered")
        );

        let rejected = account_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(rejected, IdentityError::Rejected(ref m) if m.contains("429")));

        let outage = account_error(StatusCode::SERVICE_UNAVAILABLE, "{}");
        assert!(matches!(outage, IdentityError::Unavailable(_)));
    }

    #[test]
    fn session_body_yields_token_and_user() {
        let session = parse_session(
            r#"{"access_token": "jwt", "token_type": "bearer", "user": {"id": "u-1"}}"#,
        )
        .unwrap();

        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert_eq!(session.user, Some(json!({ "id": "u-1" })));
    }

    #[test]
    fn bare_user_body_has_no_token() {
        let body = r#"{"id": "u-1", "email": "a@example.test", "confirmation_sent_at": "x"}"#;

        let session = parse_session(body).unwrap();

        assert_eq!(session.access_token, None);
        assert_eq!(session.user.unwrap()["id"], "u-1");
    }
}
