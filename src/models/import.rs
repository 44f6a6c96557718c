// src/models/import.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{models::question::NewQuestion, utils::html::clean_text};

/// One record of a bulk question upload.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportRecord {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: i64,
}

/// Outcome of a bulk upload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

impl ImportRecord {
    /// Checks the record and turns it into an insertable question.
    ///
    /// Rejects an empty question, fewer than two options and a
    /// `correctIndex` outside the options list.
    pub fn into_new_question(self) -> Result<NewQuestion, String> {
        self.validate().map_err(|e| e.to_string())?;

        let question = clean_text(&self.question);
        if question.is_empty() {
            return Err("question is empty".to_string());
        }

        let correct_index = usize::try_from(self.correct_index)
            .ok()
            .filter(|idx| *idx < self.options.len())
            .ok_or_else(|| format!("correctIndex {} is out of bounds", self.correct_index))?;

        let options = self.options.iter().map(|o| clean_text(o)).collect();

        Ok(NewQuestion {
            question,
            options,
            correct_index,
        })
    }
}

/// Parses one raw JSON record; malformed shapes are rejected like invalid values.
pub fn parse_record(raw: serde_json::Value) -> Result<NewQuestion, String> {
    let record: ImportRecord = serde_json::from_value(raw).map_err(|e| e.to_string())?;
    record.into_new_question()
}
