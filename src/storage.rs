//! JSON files read and written by the `qscore` binary.

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::ensure_parent_dir;
use crate::scoring::{Answer, ScoreRecord};

/// One response to score.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnswersFile {
    /// Overrides the config file's category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub answers: Vec<Answer>,

    /// Prior raw scores for z-score and percentile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Vec<f64>>,
}

/// Load a response from a JSON file
pub fn load_answers(path: &Path) -> Result<AnswersFile> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open answers file at {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse answers file at {}", path.display()))
}

/// Load a reference population: a JSON array of prior raw scores
pub fn load_reference(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open reference file at {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse reference file at {}: expected an array of numbers", path.display()))
}

/// Save a score record to a JSON file atomically
///
/// The previous record, if any, is replaced as a whole; a reader never sees
/// a partially written file.
pub fn save_record(path: &Path, record: &ScoreRecord) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, record).context("Failed to serialize score record")?;

    file.commit().context("Failed to save score record")?;

    Ok(())
}

/// Load a previously saved score record
pub fn load_record(path: &Path) -> Result<ScoreRecord> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open score record at {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file)).context("Failed to load score record")
}
