use crate::core::moderation::{
    Classifier, ClassifierOutcome, DecisionSource, ModerationDecision, UnavailableReason,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "omni-moderation-latest";

/// OpenAI moderation endpoint as a remote `Classifier`.
///
/// Without an API key every call reports `Unconfigured`, which sends the gate
/// straight to its local blocklist.
pub struct OpenAiModerationClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

impl OpenAiModerationClient {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/moderations", base_url.trim_end_matches('/')),
            model,
        })
    }
}

/// Only the first result counts. A body with no results at all is treated as a
/// failure rather than a pass.
fn parse_moderation(body: &str) -> ClassifierOutcome {
    let response: ModerationResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            return ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(format!(
                "malformed moderation body: {}",
                e
            )))
        }
    };

    match response.results.into_iter().next() {
        Some(result) if result.flagged => ClassifierOutcome::Decided(ModerationDecision::block(
            result.categories,
            DecisionSource::Remote,
        )),
        Some(result) => ClassifierOutcome::Decided(ModerationDecision {
            allowed: true,
            categories: result.categories,
            source: DecisionSource::Remote,
        }),
        None => ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(
            "moderation response had no results".to_string(),
        )),
    }
}

#[async_trait]
impl Classifier for OpenAiModerationClient {
    async fn classify(&self, text: &str) -> ClassifierOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return ClassifierOutcome::Unavailable(UnavailableReason::Unconfigured);
        };

        let payload = json!({
            "model": self.model,
            "input": text,
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors carry the url, never the body
                return ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(
                    e.to_string(),
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(format!(
                "OpenAI moderation returned {}",
                status
            )));
        }

        match response.text().await {
            Ok(body) => parse_moderation(&body),
            Err(e) => {
                ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(e.to_string()))
            }
        }
    }
}
