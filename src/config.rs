// Runtime configuration, read from the environment once at startup.
//
// Credentials are optional here. A missing OpenAI key just means moderation
// runs on the local blocklist; the other services complain when a command
// actually needs them.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::core::entitlements::DEFAULT_CACHE_TTL;
use crate::infra::{openai, revenuecat, supabase};

const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub revenuecat_api_key: Option<String>,
    pub revenuecat_base_url: String,
    pub entitlement_cache_ttl: Duration,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub moderation_model: String,
    /// Upper bound for every outbound call.
    pub remote_timeout: Duration,
    /// Added on top of the built-in blocklist terms.
    pub extra_blocklist_terms: Vec<String>,
    /// Include classifier categories in "blocked" responses. Off outside debugging.
    pub expose_moderation_categories: bool,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Link target of sign-up confirmation emails.
    pub email_redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Tests pass a map instead of
    /// touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ttl_ms = parse_or(
            &lookup,
            "REV_CAT_CACHE_TTL_MS",
            DEFAULT_CACHE_TTL.as_millis() as u64,
        )?;
        let timeout_ms = parse_or(&lookup, "REMOTE_TIMEOUT_MS", DEFAULT_REMOTE_TIMEOUT_MS)?;

        let extra_blocklist_terms = optional(&lookup, "MODERATION_BLOCKLIST")
            .map(|terms| terms.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            revenuecat_api_key: optional(&lookup, "REVENUECAT_SECRET_API_KEY"),
            revenuecat_base_url: optional(&lookup, "REVENUECAT_BASE_URL")
                .unwrap_or_else(|| revenuecat::DEFAULT_BASE_URL.to_string()),
            entitlement_cache_ttl: Duration::from_millis(ttl_ms),
            openai_api_key: optional(&lookup, "OPENAI_API_KEY"),
            openai_base_url: optional(&lookup, "OPENAI_BASE_URL")
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
            moderation_model: optional(&lookup, "OPENAI_MODERATION_MODEL")
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            remote_timeout: Duration::from_millis(timeout_ms),
            extra_blocklist_terms,
            expose_moderation_categories: parse_or(&lookup, "MODERATION_EXPOSE_CATEGORIES", false)?,
            supabase_url: optional(&lookup, "SUPABASE_URL"),
            supabase_anon_key: optional(&lookup, "SUPABASE_ANON_KEY"),
            email_redirect_url: optional(&lookup, "SUPABASE_EMAIL_REDIRECT_URL")
                .unwrap_or_else(|| supabase::DEFAULT_EMAIL_REDIRECT_URL.to_string()),
        })
    }
}

/// Blank values count as unset.
fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(lookup, key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.entitlement_cache_ttl, Duration::from_millis(60_000));
        assert_eq!(config.remote_timeout, Duration::from_millis(5_000));
        assert_eq!(config.revenuecat_base_url, "https://api.revenuecat.com/v1");
        assert_eq!(config.moderation_model, "omni-moderation-latest");
        assert!(config.openai_api_key.is_none());
        assert!(config.extra_blocklist_terms.is_empty());
        assert!(!config.expose_moderation_categories);
        assert_eq!(config.email_redirect_url, "http://localhost:3000/auth/confirm");
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("REV_CAT_CACHE_TTL_MS", "1500"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MODERATION_BLOCKLIST", "gore, weapon"),
            ("MODERATION_EXPOSE_CATEGORIES", "true"),
        ])
        .unwrap();

        assert_eq!(config.entitlement_cache_ttl, Duration::from_millis(1500));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.extra_blocklist_terms, vec!["gore", " weapon"]);
        assert!(config.expose_moderation_categories);
    }

    #[test]
    fn blank_key_means_unconfigured() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();

        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn invalid_number_is_an_error() {
        let result = config_from(&[("REV_CAT_CACHE_TTL_MS", "a minute")]);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "REV_CAT_CACHE_TTL_MS",
                ..
            })
        ));
    }
}
