// Core entitlements module - answers "does this subscriber hold this entitlement?"
// with a short-lived local cache in front of the billing platform.

pub mod entitlement_cache;
pub mod entitlement_models;
pub mod entitlement_service;

pub use entitlement_models::*;
pub use entitlement_service::{EntitlementService, SubscriptionProvider};
