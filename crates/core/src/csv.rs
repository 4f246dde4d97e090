//! CSV parse-and-preview with `{{field}}` placeholder substitution
//!
//! Recipient lists are plain CSV files whose header names double as the
//! placeholder vocabulary for mail templates.

use crate::error::CoreResult;

/// Parsed header and rows of a recipient CSV
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvPreview {
    fields: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvPreview {
    /// Parse CSV text with a header row; empty lines are skipped and
    /// ragged rows are padded or truncated to the header width.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let fields: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(fields.len(), String::new());
            rows.push(row);
        }

        Ok(Self { fields, rows })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `{{field}}` tokens available to templates for this file
    pub fn placeholders(&self) -> Vec<String> {
        self.fields.iter().map(|f| format!("{{{{{f}}}}}")).collect()
    }

    /// Substitute `{{field}}` tokens in `template` with values from the
    /// given row. Tokens that name no header are left untouched.
    pub fn render(&self, template: &str, row_index: usize) -> Option<String> {
        let row = self.rows.get(row_index)?;
        let mut rendered = template.to_string();
        for (index, field) in self.fields.iter().enumerate() {
            let token = format!("{{{{{field}}}}}");
            let value = row.get(index).map(String::as_str).unwrap_or_default();
            rendered = rendered.replace(&token, value);
        }
        Some(rendered)
    }
}
