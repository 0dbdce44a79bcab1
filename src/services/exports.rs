//! CSV downloads and uploads.

use crate::errors::ServiceError;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::collections::HashMap;

/// A rendered CSV file ready to be streamed as an attachment
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl CsvExport {
    /// Render a header row followed by `rows`
    pub fn build<I>(filename: impl Into<String>, headers: &[&str], rows: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(format!("CSV flush failed: {}", e)))?;

        Ok(Self {
            filename: filename.into(),
            bytes,
        })
    }
}

/// Money and other two-decimal figures
pub fn money(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn opt_string(value: Option<&str>) -> String {
    value.unwrap_or("").to_string()
}

/// Uploaded CSV with a case-insensitive header lookup
#[derive(Debug)]
pub struct CsvTable {
    header_map: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// Parse `bytes`, failing with a validation error naming the first missing column.
    pub fn parse(bytes: &[u8], required: &[&str]) -> Result<Self, ServiceError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        let header_map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();

        for column in required {
            if !header_map.contains_key(&column.to_lowercase()) {
                return Err(ServiceError::ValidationError(format!(
                    "Missing required column: {}",
                    column
                )));
            }
        }

        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            header_map,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows paired with their 1-based line number in the file (the header is line 1)
    pub fn rows(&self) -> impl Iterator<Item = CsvRow<'_>> {
        self.records.iter().enumerate().map(move |(i, record)| CsvRow {
            line: i + 2,
            record,
            header_map: &self.header_map,
        })
    }
}

pub struct CsvRow<'a> {
    pub line: usize,
    record: &'a StringRecord,
    header_map: &'a HashMap<String, usize>,
}

impl<'a> CsvRow<'a> {
    /// Trimmed, non-empty value of `column`
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.header_map
            .get(&column.to_lowercase())
            .and_then(|&idx| self.record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn require(&self, column: &str) -> Result<&'a str, ServiceError> {
        self.get(column).ok_or_else(|| {
            ServiceError::ValidationError(format!("Row {}: {} is required", self.line, column))
        })
    }

    pub fn number(&self, column: &str) -> Result<Option<f64>, ServiceError> {
        self.get(column)
            .map(|v| {
                v.parse::<f64>().map_err(|_| {
                    ServiceError::ValidationError(format!(
                        "Row {}: {} must be a number, got {:?}",
                        self.line, column, v
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_header_then_rows() {
        let export = CsvExport::build(
            "suppliers.csv",
            &["Name", "Rating"],
            vec![vec!["Acme, Ltd".to_string(), money(4.5)]],
        )
        .unwrap();
        let text = String::from_utf8(export.bytes).unwrap();
        assert_eq!(text, "Name,Rating\n\"Acme, Ltd\",4.50\n");
    }

    #[test]
    fn parse_reports_missing_column() {
        let err = CsvTable::parse(b"year,planned_cost\n2024,10\n", &["year", "q1_cost"]).unwrap_err();
        assert!(err.to_string().contains("q1_cost"));
    }

    #[test]
    fn rows_are_case_insensitive_and_trimmed() {
        let table = CsvTable::parse(b"Item, Quantity \n  Cotton , 12.5\nYarn,abc\n", &["item"]).unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("item"), Some("Cotton"));
        assert_eq!(rows[0].number("quantity").unwrap(), Some(12.5));
        assert_eq!(rows[1].line, 3);
        assert!(rows[1].number("Quantity").is_err());
        assert!(rows[1].require("Missing").is_err());
    }
}
