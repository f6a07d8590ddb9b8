use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use crate::core::entitlements::{
    EntitlementError, EntitlementStatus, SubscriberEntitlements, SubscriptionProvider,
};

pub const DEFAULT_BASE_URL: &str = "https://api.revenuecat.com/v1";

/// Minimal RevenueCat REST client. It only exposes the two subscriber reads the core layer needs.
pub struct RevenueCatClient {
    client: Client,
    base_url: Url,
}

impl RevenueCatClient {
    pub fn new(
        secret_api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, EntitlementError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", secret_api_key))
                .map_err(|e| EntitlementError::RemoteUnavailable(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| EntitlementError::RemoteUnavailable(e.to_string()))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| EntitlementError::RemoteUnavailable(format!("bad base url: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// `{base}/subscribers/{id}[/{suffix}]`, with the id percent-encoded as one path segment.
    fn subscriber_url(
        &self,
        subscriber_id: &str,
        suffix: Option<&str>,
    ) -> Result<Url, EntitlementError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                EntitlementError::RemoteUnavailable("base url cannot hold a path".to_string())
            })?;
            segments.pop_if_empty().push("subscribers").push(subscriber_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, EntitlementError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EntitlementError::RemoteUnavailable(e.to_string()))?;

        check_status(resp.status())?;

        resp.text()
            .await
            .map_err(|e| EntitlementError::RemoteUnavailable(e.to_string()))
    }
}

/// Any non-2xx answer, 404 included, leaves the entitlement state unknown.
fn check_status(status: StatusCode) -> Result<(), EntitlementError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(EntitlementError::RemoteUnavailable(format!(
            "RevenueCat returned {}",
            status
        )))
    }
}

/// `GET /subscribers/{id}` wraps everything in a `subscriber` object.
///
/// Only the body as a whole has to be JSON. A missing or null `entitlements`
/// map means nothing is active, and an entitlement whose `active` flag is
/// missing, null or not a boolean counts as inactive without affecting the
/// others.
fn parse_subscriber(body: &str) -> Result<SubscriberEntitlements, EntitlementError> {
    let document: Value = serde_json::from_str(body).map_err(|e| {
        EntitlementError::RemoteUnavailable(format!("malformed subscriber body: {}", e))
    })?;

    let entitlements = document
        .pointer("/subscriber/entitlements")
        .and_then(Value::as_object)
        .map(|entitlements| {
            entitlements
                .iter()
                .map(|(name, status)| {
                    let active = status.get("active").and_then(Value::as_bool);
                    (
                        name.clone(),
                        EntitlementStatus {
                            active: active.unwrap_or(false),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SubscriberEntitlements { entitlements })
}

#[async_trait]
impl SubscriptionProvider for RevenueCatClient {
    async fn fetch_entitlements(
        &self,
        subscriber_id: &str,
    ) -> Result<SubscriberEntitlements, EntitlementError> {
        let url = self.subscriber_url(subscriber_id, None)?;
        let body = self.get_text(url).await?;
        parse_subscriber(&body)
    }

    async fn fetch_offerings(
        &self,
        subscriber_id: &str,
    ) -> Result<serde_json::Value, EntitlementError> {
        let url = self.subscriber_url(subscriber_id, Some("offerings"))?;
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            EntitlementError::RemoteUnavailable(format!("malformed offerings body: {}", e))
        })
    }
}
