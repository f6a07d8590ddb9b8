// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "entitlements/mod.rs"]
pub mod entitlements;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "identity/identity_service.rs"]
pub mod identity;

#[path = "micro_actions/mod.rs"]
pub mod micro_actions;
