// Lint rules for the micro-actions dataset.
//
// Checks:
// - the canonical sample row header matches the expected column order
// - the dataset has the expected number of rows
// - every id looks like `act_` followed by four ASCII digits
// - no id appears twice
// - ids match the committed baseline, in order
//
// A SHA-256 of the sorted ids is reported for auditing. Loading the files is
// the infra layer's job; this module only sees the parsed dataset.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub const EXPECTED_SAMPLE_HEADER: [&str; 16] = [
    "utc_ts",
    "local_datetime",
    "timezone",
    "primary_emotion",
    "secondary_emotion",
    "energy_level",
    "context",
    "action_id",
    "action_name",
    "action_category",
    "favorited",
    "duration_seconds",
    "completed",
    "skipped",
    "reflection",
    "note_text",
];

pub const EXPECTED_ROW_COUNT: usize = 65;

const ID_PREFIX: &str = "act_";
const ID_DIGITS: usize = 4;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {}: {}", .path.display(), .reason)]
    Csv { path: PathBuf, reason: String },

    #[error("{} has no `id` column", .path.display())]
    MissingIdColumn { path: PathBuf },

    #[error("Malformed baseline {}: {}", .path.display(), .source)]
    Baseline {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the lint needs, already parsed.
#[derive(Debug, Clone, Default)]
pub struct MicroActionDataset {
    /// First line of the canonical sample row file.
    pub sample_header: String,
    /// `id` column of the dataset, in file order.
    pub ids: Vec<String>,
    /// Committed list of ids the dataset must keep.
    pub baseline: Vec<String>,
}

/// Where the dataset comes from.
pub trait MicroActionSource {
    fn load(&self) -> Result<MicroActionDataset, LintError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub header_ok: bool,
    pub row_count: usize,
    pub ids_well_formed: bool,
    /// Each duplicated id once, in the order its first repeat was seen.
    pub duplicates: Vec<String>,
    pub stable_vs_baseline: bool,
    pub checksum: String,
}

impl LintReport {
    pub fn passed(&self) -> bool {
        self.header_ok
            && self.row_count == EXPECTED_ROW_COUNT
            && self.ids_well_formed
            && self.duplicates.is_empty()
            && self.stable_vs_baseline
    }

    /// Human-readable report, one line per check.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(if self.header_ok {
            "✔ Canonical sample header matches expected order".to_string()
        } else {
            "✖ Canonical sample header mismatch".to_string()
        });

        lines.push(if self.row_count == EXPECTED_ROW_COUNT {
            format!("✔ Loaded micro-actions: {}", self.row_count)
        } else {
            format!("✖ Expected {}, got {}", EXPECTED_ROW_COUNT, self.row_count)
        });

        lines.push(if self.ids_well_formed {
            "✔ ID format valid".to_string()
        } else {
            "✖ ID format invalid".to_string()
        });

        lines.push(if self.duplicates.is_empty() {
            "✔ No duplicate IDs".to_string()
        } else {
            format!("✖ Duplicates: {}", self.duplicates.join(", "))
        });

        lines.push(if self.stable_vs_baseline {
            "✔ All IDs stable vs baseline".to_string()
        } else {
            "✖ IDs changed from baseline".to_string()
        });

        lines.push(format!("Checksum (sha256 of sorted IDs): {}", self.checksum));
        lines.push(format!(
            "Overall: {}",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        lines
    }
}

pub fn lint(dataset: &MicroActionDataset) -> LintReport {
    let expected_header = EXPECTED_SAMPLE_HEADER.join(",");

    LintReport {
        header_ok: dataset.sample_header.trim() == expected_header,
        row_count: dataset.ids.len(),
        ids_well_formed: dataset.ids.iter().all(|id| is_valid_action_id(id)),
        duplicates: find_duplicates(&dataset.ids),
        stable_vs_baseline: dataset.baseline == dataset.ids,
        checksum: sorted_id_checksum(&dataset.ids),
    }
}

pub fn is_valid_action_id(id: &str) -> bool {
    id.strip_prefix(ID_PREFIX)
        .map(|digits| digits.len() == ID_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// SHA-256 (hex) of the ids sorted and joined with newlines.
pub fn sorted_id_checksum(ids: &[String]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(sorted.join("\n").as_bytes());
    hex::encode(hasher.finalize())
}

fn find_duplicates(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for id in ids {
        if !seen.insert(id.as_str()) && !duplicates.contains(id) {
            duplicates.push(id.clone());
        }
    }

    duplicates
}
