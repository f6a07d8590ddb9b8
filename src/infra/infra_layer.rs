// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "revenuecat/revenuecat_client.rs"]
pub mod revenuecat;

#[path = "openai/moderation_client.rs"]
pub mod openai;

#[path = "supabase/auth_client.rs"]
pub mod supabase;

#[path = "micro_actions/file_source.rs"]
pub mod micro_actions;
