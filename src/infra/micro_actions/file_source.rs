// File-backed source for the micro-actions lint.
//
// Layout inside the data directory:
// - canonical_sample_row.csv   (only the first line matters)
// - micro_actions.csv          (header row with an `id` column)
// - micro_actions_baseline.json (JSON array of ids)

use crate::core::micro_actions::{LintError, MicroActionDataset, MicroActionSource};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};

const SAMPLE_ROW_FILE: &str = "canonical_sample_row.csv";
const DATASET_FILE: &str = "micro_actions.csv";
const BASELINE_FILE: &str = "micro_actions_baseline.json";
const ID_COLUMN: &str = "id";

pub struct MicroActionFiles {
    data_dir: PathBuf,
}

impl MicroActionFiles {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn read(&self, name: &str) -> Result<(PathBuf, String), LintError> {
        let path = self.data_dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok((path, text)),
            Err(source) => Err(LintError::Io { path, source }),
        }
    }
}

impl MicroActionSource for MicroActionFiles {
    fn load(&self) -> Result<MicroActionDataset, LintError> {
        let (_, sample) = self.read(SAMPLE_ROW_FILE)?;
        let sample_header = sample.lines().next().unwrap_or_default().to_string();

        let (dataset_path, dataset) = self.read(DATASET_FILE)?;
        let ids = id_column(&dataset_path, &dataset)?;

        let (baseline_path, baseline) = self.read(BASELINE_FILE)?;
        let baseline: Vec<String> = serde_json::from_str(&baseline).map_err(|source| {
            LintError::Baseline {
                path: baseline_path,
                source,
            }
        })?;

        Ok(MicroActionDataset {
            sample_header,
            ids,
            baseline,
        })
    }
}

/// Values of the `id` column. Fields are trimmed, empty lines skipped, and every
/// row must have as many fields as the header.
fn id_column(path: &Path, text: &str) -> Result<Vec<String>, LintError> {
    let csv_error = |e: csv::Error| LintError::Csv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(text.as_bytes());

    let id_index = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|column| column == ID_COLUMN)
        .ok_or_else(|| LintError::MissingIdColumn {
            path: path.to_path_buf(),
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        ids.push(record.get(id_index).unwrap_or_default().to_string());
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_data_dir(dataset: &str, baseline: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SAMPLE_ROW_FILE),
            "utc_ts,local_datetime\r\n2025-01-01T00:00:00Z,2025-01-01 09:00\r\n",
        )
        .unwrap();
        fs::write(dir.path().join(DATASET_FILE), dataset).unwrap();
        fs::write(dir.path().join(BASELINE_FILE), baseline).unwrap();
        dir
    }

    #[test]
    fn test_load_reads_all_three_files() {
        let dir = write_data_dir(
            "id,name,category\nact_0001,Breathe,calm\n\n act_0002 ,\"Walk, slowly\",move\n",
            r#"["act_0001", "act_0002"]"#,
        );

        let dataset = MicroActionFiles::new(dir.path()).load().unwrap();

        assert_eq!(dataset.sample_header, "utc_ts,local_datetime");
        assert_eq!(dataset.ids, vec!["act_0001", "act_0002"]);
        assert_eq!(dataset.baseline, dataset.ids);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();

        let result = MicroActionFiles::new(dir.path()).load();

        assert!(matches!(result, Err(LintError::Io { .. })));
    }

    #[test]
    fn test_missing_id_column() {
        let dir = write_data_dir("name\nBreathe\n", "[]");

        let result = MicroActionFiles::new(dir.path()).load();

        assert!(matches!(result, Err(LintError::MissingIdColumn { .. })));
    }

    #[test]
    fn test_bad_baseline() {
        let dir = write_data_dir("id\nact_0001\n", "{not json");

        let result = MicroActionFiles::new(dir.path()).load();

        assert!(matches!(result, Err(LintError::Baseline { .. })));
    }

    #[test]
    fn test_quoted_fields_with_newlines_and_escapes() {
        let ids = id_column(
            Path::new("micro_actions.csv"),
            "id,note\r\nact_0001,\"line one\nline \"\"two\"\"\"\r\n\"act_0002\",plain",
        )
        .unwrap();

        assert_eq!(ids, vec!["act_0001", "act_0002"]);
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let result = id_column(Path::new("micro_actions.csv"), "id,name\nact_0001\n");

        assert!(matches!(result, Err(LintError::Csv { .. })));
    }

    #[test]
    fn test_bare_quote_inside_field_is_rejected() {
        let result = id_column(
            Path::new("micro_actions.csv"),
            "id,note\nact_0001,he said \"hi, there\"\n",
        );

        assert!(matches!(result, Err(LintError::Csv { .. })));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let ids = id_column(Path::new("micro_actions.csv"), "\u{feff}id,name\nact_0001,Breathe\n")
            .unwrap();

        assert_eq!(ids, vec!["act_0001"]);
    }
}
