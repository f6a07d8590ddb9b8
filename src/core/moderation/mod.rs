// Core moderation module - decides whether user text may be used downstream.
// Remote classifier first, local blocklist as the guaranteed fallback.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
