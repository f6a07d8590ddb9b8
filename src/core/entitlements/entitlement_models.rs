// Entitlement domain models.
//
// These mirror the parts of a billing platform's subscriber document we care
// about. Anything else the platform returns is ignored.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Entitlement checked when the caller doesn't name one.
pub const DEFAULT_ENTITLEMENT: &str = "premium";

/// How long a resolved entitlement stays fresh in the local cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(60_000);

#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The subscription-status API failed, timed out or answered with a non-2xx status.
    /// There is no safe default, so this always reaches the caller.
    #[error("Subscription status API unavailable: {0}")]
    RemoteUnavailable(String),
}

/// Entitlement state for one subscriber as reported by the billing platform.
#[derive(Debug, Clone, Default)]
pub struct SubscriberEntitlements {
    pub entitlements: HashMap<String, EntitlementStatus>,
}

impl SubscriberEntitlements {
    /// An entitlement the platform doesn't mention is simply inactive.
    pub fn is_active(&self, entitlement: &str) -> bool {
        self.entitlements
            .get(entitlement)
            .map(|status| status.active)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntitlementStatus {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entitlement_is_inactive() {
        let mut entitlements = HashMap::new();
        entitlements.insert("premium".to_string(), EntitlementStatus { active: true });
        entitlements.insert("legacy".to_string(), EntitlementStatus::default());
        let subscriber = SubscriberEntitlements { entitlements };

        assert!(subscriber.is_active("premium"));
        assert!(!subscriber.is_active("legacy"));
        assert!(!subscriber.is_active("pro"));
    }
}
