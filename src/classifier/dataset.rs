//! Labeled corpora on disk
//!
//! One JSON object per line:
//!
//! ```text
//! {"code": "def f():\n    return 1\n", "label": "REAL"}
//! ```

use crate::error::{HdvaError, HdvaResult};
use crate::models::{Dataset, Label, LabeledExample};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read a JSONL corpus. Blank lines are skipped; a malformed line is an error.
pub fn load_jsonl(path: &Path) -> HdvaResult<Dataset> {
    let input_err = |source: std::io::Error| HdvaError::Input {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(input_err)?);

    let mut examples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(input_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let example: LabeledExample = serde_json::from_str(&line).map_err(|e| {
            HdvaError::Dataset(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        examples.push(example);
    }

    tracing::info!("Loaded {} labeled examples from {}", examples.len(), path.display());
    Ok(examples)
}

/// Write a corpus as JSONL, replacing any existing file
pub fn save_jsonl(path: &Path, dataset: &[LabeledExample]) -> HdvaResult<()> {
    let output_err = |source: std::io::Error| HdvaError::Input {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_err)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(output_err)?);
    for example in dataset {
        serde_json::to_writer(&mut writer, example).map_err(|e| output_err(e.into()))?;
        writer.write_all(b"\n").map_err(output_err)?;
    }
    writer.flush().map_err(output_err)?;
    Ok(())
}

/// Per-label counts of a corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub total: usize,
    pub real: usize,
    pub hallucinated: usize,
}

impl DatasetStats {
    pub fn of(dataset: &[LabeledExample]) -> Self {
        let hallucinated = dataset.iter().filter(|e| e.label == Label::Hallucinated).count();
        Self {
            total: dataset.len(),
            real: dataset.len() - hallucinated,
            hallucinated,
        }
    }
}

impl std::fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pct = |n: usize| {
            if self.total > 0 {
                n as f64 / self.total as f64 * 100.0
            } else {
                0.0
            }
        };
        write!(
            f,
            "{} examples: {} REAL ({:.1}%), {} HALLUCINATED ({:.1}%)",
            self.total,
            self.real,
            pct(self.real),
            self.hallucinated,
            pct(self.hallucinated)
        )
    }
}
