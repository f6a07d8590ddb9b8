// Moderation domain models.
//
// These are pure domain types with no HTTP dependencies.
// The request glue turns a blocked decision into a rejection response.

use serde::Serialize;
use std::collections::BTreeMap;

/// Category reported by the local blocklist when a term matches.
pub const POLICY_CATEGORY: &str = "policy";

/// Terms the local blocklist always contains: self-harm, violent and hateful content.
pub const DEFAULT_BLOCKLIST: [&str; 4] = ["forbidden", "bomb", "hate", "self-harm"];

/// Which classifier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Remote,
    Local,
}

/// Outcome of moderating one piece of text.
///
/// Never cached: it is a function of sensitive user text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationDecision {
    pub allowed: bool,
    /// Category name -> flagged. Empty when nothing was flagged.
    pub categories: BTreeMap<String, bool>,
    pub source: DecisionSource,
}

impl ModerationDecision {
    pub fn allow(source: DecisionSource) -> Self {
        Self {
            allowed: true,
            categories: BTreeMap::new(),
            source,
        }
    }

    pub fn block(categories: BTreeMap<String, bool>, source: DecisionSource) -> Self {
        Self {
            allowed: false,
            categories,
            source,
        }
    }
}

/// Why a classifier could not give a definite answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No credential configured. A normal state, not an error.
    Unconfigured,
    /// The call failed, timed out or returned a non-success status.
    ClassifierFailure(String),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Unconfigured => write!(f, "classifier not configured"),
            UnavailableReason::ClassifierFailure(reason) => {
                write!(f, "classifier failure: {}", reason)
            }
        }
    }
}

/// What a single classifier returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutcome {
    Decided(ModerationDecision),
    Unavailable(UnavailableReason),
}

/// Identifiers that may be logged next to a moderation decision.
/// Ids only, never the text.
#[derive(Debug, Clone, Default)]
pub struct ModerationContext {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub prompt_id: Option<String>,
}
