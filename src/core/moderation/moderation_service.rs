// Moderation gate - core business logic for content moderation.
//
// This service handles:
// - Asking the remote classifier (semantic categories, more accurate)
// - Falling back to a local keyword blocklist when the remote one is
//   unconfigured, failing or too slow
//
// A decision always exists. Remote failures are never surfaced to callers.
// The text passed in is never logged here, only the fallback reason.

use super::moderation_models::{
    ClassifierOutcome, DecisionSource, ModerationDecision, UnavailableReason, DEFAULT_BLOCKLIST,
    POLICY_CATEGORY,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// CLASSIFIER TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`. Returns `Unavailable` instead of an error when no
    /// definite answer can be given.
    async fn classify(&self, text: &str) -> ClassifierOutcome;
}

// Blanket implementation so the composition root can swap classifiers at runtime.
#[async_trait]
impl Classifier for Box<dyn Classifier> {
    async fn classify(&self, text: &str) -> ClassifierOutcome {
        (**self).classify(text).await
    }
}

// ============================================================================
// LOCAL BLOCKLIST
// ============================================================================

/// Case-insensitive substring blocklist. Cannot fail.
///
/// Anything not containing a listed term is allowed.
#[derive(Debug, Clone)]
pub struct LocalBlocklist {
    terms: Vec<String>,
}

impl LocalBlocklist {
    /// The default terms plus `extra_terms`. Extra terms are lower-cased and
    /// trimmed; blanks and repeats are dropped.
    pub fn new(extra_terms: impl IntoIterator<Item = String>) -> Self {
        let mut terms: Vec<String> = DEFAULT_BLOCKLIST.iter().map(|t| t.to_string()).collect();

        for term in extra_terms {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }

        Self { terms }
    }

    pub fn classify_local(&self, text: &str) -> ModerationDecision {
        let lower = text.to_lowercase();

        if self.terms.iter().any(|term| lower.contains(term.as_str())) {
            let mut categories = BTreeMap::new();
            categories.insert(POLICY_CATEGORY.to_string(), true);
            ModerationDecision::block(categories, DecisionSource::Local)
        } else {
            ModerationDecision::allow(DecisionSource::Local)
        }
    }
}

impl Default for LocalBlocklist {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Classifier for LocalBlocklist {
    async fn classify(&self, text: &str) -> ClassifierOutcome {
        ClassifierOutcome::Decided(self.classify_local(text))
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Remote classifier first, local blocklist second. First definite result wins.
pub struct ModerationGate<R: Classifier> {
    remote: R,
    fallback: LocalBlocklist,
    timeout: Duration,
}

impl<R: Classifier> ModerationGate<R> {
    pub fn new(remote: R, fallback: LocalBlocklist, timeout: Duration) -> Self {
        Self {
            remote,
            fallback,
            timeout,
        }
    }

    /// Ask the remote classifier, treating a timeout like any other failure.
    pub async fn classify_remote(&self, text: &str) -> ClassifierOutcome {
        match tokio::time::timeout(self.timeout, self.remote.classify(text)).await {
            Ok(outcome) => outcome,
            Err(_) => ClassifierOutcome::Unavailable(UnavailableReason::ClassifierFailure(
                format!("timed out after {} ms", self.timeout.as_millis()),
            )),
        }
    }

    pub fn classify_local(&self, text: &str) -> ModerationDecision {
        self.fallback.classify_local(text)
    }

    pub async fn decide(&self, text: &str) -> ModerationDecision {
        match self.classify_remote(text).await {
            ClassifierOutcome::Decided(decision) => decision,
            ClassifierOutcome::Unavailable(UnavailableReason::Unconfigured) => {
                tracing::debug!("Remote moderation not configured, using local blocklist");
                self.classify_local(text)
            }
            ClassifierOutcome::Unavailable(reason) => {
                tracing::warn!(%reason, "Remote moderation unavailable, using local blocklist");
                self.classify_local(text)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
