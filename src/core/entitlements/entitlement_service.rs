// Entitlement service - the cache-then-remote resolution flow.
//
// NO HTTP types here. The billing platform sits behind the SubscriptionProvider
// port, so the flow can be tested with an in-memory provider.

use super::entitlement_cache::{cache_key, EntitlementCache};
use super::entitlement_models::{EntitlementError, SubscriberEntitlements};
use async_trait::async_trait;
use std::time::Duration;

// ============================================================================
// PROVIDER TRAIT (PORT)
// ============================================================================

/// Remote subscription-status API.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Fetch the entitlement map for a subscriber.
    async fn fetch_entitlements(
        &self,
        subscriber_id: &str,
    ) -> Result<SubscriberEntitlements, EntitlementError>;

    /// Fetch the purchase offerings for a subscriber, as raw JSON to relay.
    async fn fetch_offerings(
        &self,
        subscriber_id: &str,
    ) -> Result<serde_json::Value, EntitlementError>;
}

// Lets the composition root pick the provider at runtime.
#[async_trait]
impl SubscriptionProvider for Box<dyn SubscriptionProvider> {
    async fn fetch_entitlements(
        &self,
        subscriber_id: &str,
    ) -> Result<SubscriberEntitlements, EntitlementError> {
        (**self).fetch_entitlements(subscriber_id).await
    }

    async fn fetch_offerings(
        &self,
        subscriber_id: &str,
    ) -> Result<serde_json::Value, EntitlementError> {
        (**self).fetch_offerings(subscriber_id).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct EntitlementService<P: SubscriptionProvider> {
    provider: P,
    cache: EntitlementCache,
    ttl: Duration,
    timeout: Duration,
}

impl<P: SubscriptionProvider> EntitlementService<P> {
    /// `ttl` bounds how long a resolved answer is reused, `timeout` bounds each
    /// remote call.
    pub fn new(provider: P, ttl: Duration, timeout: Duration) -> Self {
        Self {
            provider,
            cache: EntitlementCache::new(),
            ttl,
            timeout,
        }
    }

    /// Is `entitlement` active for `subscriber_id`?
    ///
    /// Only successful remote answers are cached. A failure is returned as
    /// `RemoteUnavailable` and the next call goes to the remote API again.
    /// Concurrent misses on the same key each call the remote API.
    pub async fn resolve(
        &self,
        subscriber_id: &str,
        entitlement: &str,
    ) -> Result<bool, EntitlementError> {
        let key = cache_key(subscriber_id, entitlement);

        if let Some(active) = self.cache.get(&key) {
            tracing::debug!(subscriber_id, entitlement, active, "Entitlement cache hit");
            return Ok(active);
        }

        let subscriber = match tokio::time::timeout(
            self.timeout,
            self.provider.fetch_entitlements(subscriber_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EntitlementError::RemoteUnavailable(format!(
                "timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
        .map_err(|e| {
            tracing::warn!(subscriber_id, entitlement, "Entitlement lookup failed: {}", e);
            e
        })?;

        let active = subscriber.is_active(entitlement);
        self.cache.set(key, active, self.ttl);

        tracing::debug!(subscriber_id, entitlement, active, "Entitlement resolved remotely");
        Ok(active)
    }

    /// Relay the subscriber's offerings. Never cached.
    pub async fn offerings(
        &self,
        subscriber_id: &str,
    ) -> Result<serde_json::Value, EntitlementError> {
        match tokio::time::timeout(self.timeout, self.provider.fetch_offerings(subscriber_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(EntitlementError::RemoteUnavailable(format!(
                "timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
