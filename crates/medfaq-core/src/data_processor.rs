use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{FaqRecord, DEFAULT_CATEGORY};

/// Column layout of the tabular FAQ source.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub question_column: String,
    pub answer_column: String,
    pub category_column: String,
    pub default_category: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            question_column: "Question".to_string(),
            answer_column: "Answer".to_string(),
            category_column: "qtype".to_string(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

/// Reads a CSV FAQ export into an ordered list of [`FaqRecord`]s.
#[derive(Default)]
pub struct DataProcessor {
    loader_config: LoaderConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(loader_config: LoaderConfig) -> Self { Self { loader_config } }

    pub fn load_csv(&self, path: &Path) -> Result<Vec<FaqRecord>> {
        let file = File::open(path).map_err(|e| Error::DataLoad(format!("cannot open {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "loading FAQ dataset");
        self.load_reader(file)
    }

    /// Rows missing a question or an answer are dropped; the surviving rows keep
    /// their source order. A whitespace-only value counts as missing.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Vec<FaqRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers().map_err(|e| Error::DataLoad(format!("cannot read header row: {}", e)))?.clone();

        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let question_idx = column(self.loader_config.question_column.as_str())
            .ok_or_else(|| Error::DataLoad(format!("missing required column '{}'", self.loader_config.question_column)))?;
        let answer_idx = column(self.loader_config.answer_column.as_str())
            .ok_or_else(|| Error::DataLoad(format!("missing required column '{}'", self.loader_config.answer_column)))?;
        let category_idx = column(self.loader_config.category_column.as_str());
        if category_idx.is_none() {
            debug!(column = %self.loader_config.category_column, "category column absent, using default category");
        }

        let mut records = Vec::new();
        let mut total_rows = 0usize;
        for (row, result) in csv_reader.records().enumerate() {
            let row_data = result.map_err(|e| Error::DataLoad(format!("malformed row {}: {}", row + 1, e)))?;
            total_rows += 1;
            // Blank means missing; kept values are stored as written.
            let field = |idx: usize| row_data.get(idx).filter(|v| !v.trim().is_empty());
            let (Some(question), Some(answer)) = (field(question_idx), field(answer_idx)) else { continue };
            let category = category_idx.and_then(field).unwrap_or(self.loader_config.default_category.as_str());
            records.push(FaqRecord::new(category, question, answer));
        }

        info!(rows = total_rows, kept = records.len(), dropped = total_rows - records.len(), "FAQ dataset ready");
        Ok(records)
    }
}
