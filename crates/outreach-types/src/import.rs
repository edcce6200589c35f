//! Lead import types: file formats, parsed sheets, column mappings and the
//! summary reported back after an import.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::lead::LeadField;

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Supported lead file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    /// Detect the format from a MIME type.
    pub fn from_mime(mime: &str) -> Result<Self, ImportError> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            CSV_MIME | "application/csv" => Ok(SheetFormat::Csv),
            XLSX_MIME => Ok(SheetFormat::Xlsx),
            _ => Err(ImportError::UnsupportedFormat),
        }
    }

    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(SheetFormat::Csv),
            Some("xlsx") => Ok(SheetFormat::Xlsx),
            _ => Err(ImportError::UnsupportedFormat),
        }
    }
}

impl fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetFormat::Csv => write!(f, "csv"),
            SheetFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

impl FromStr for SheetFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "xlsx" => Ok(SheetFormat::Xlsx),
            _ => Err(ImportError::UnsupportedFormat),
        }
    }
}

/// A header row plus data rows, every row the same width as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedSheet {
    /// Position of a column by exact header name, then case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.trim().eq_ignore_ascii_case(name.trim()))
            })
    }
}

/// Which file column feeds which lead field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub fields: BTreeMap<LeadField, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guess a mapping from header names.
    ///
    /// Each header is matched against the lead field names and their common
    /// synonyms; the first header claiming a field wins.
    pub fn auto_detect(columns: &[String]) -> Self {
        let mut mapping = Self::new();
        for column in columns {
            if let Ok(field) = column.parse::<LeadField>() {
                mapping
                    .fields
                    .entry(field)
                    .or_insert_with(|| column.clone());
            }
        }
        mapping
    }

    /// Apply user selections on top of this mapping.
    pub fn merge(&mut self, overrides: ColumnMapping) {
        self.fields.extend(overrides.fields);
    }

    pub fn with(mut self, field: LeadField, column: impl Into<String>) -> Self {
        self.fields.insert(field, column.into());
        self
    }

    pub fn set(&mut self, field: LeadField, column: impl Into<String>) {
        self.fields.insert(field, column.into());
    }

    pub fn column_for(&self, field: LeadField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a `field=column` assignment as given on the command line.
    pub fn parse_assignment(s: &str) -> Result<(LeadField, String), ImportError> {
        let (field, column) = s
            .split_once('=')
            .ok_or_else(|| ImportError::UnknownField(s.to_string()))?;
        let field = field
            .parse::<LeadField>()
            .map_err(|_| ImportError::UnknownField(field.trim().to_string()))?;
        Ok((field, column.trim().to_string()))
    }
}

/// Why a row did not become a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    /// 1-based row number in the file (header is row 1).
    pub row: usize,
    pub reason: String,
}

/// Outcome of one import, reported to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub invalid: usize,
    #[serde(default)]
    pub errors: Vec<RowIssue>,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows processed: {} imported, {} duplicates, {} errors",
            self.total_rows, self.imported, self.duplicates, self.invalid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_mime() {
        assert_eq!(SheetFormat::from_mime("text/csv").unwrap(), SheetFormat::Csv);
        assert_eq!(
            SheetFormat::from_mime("text/csv; charset=utf-8").unwrap(),
            SheetFormat::Csv
        );
        assert_eq!(SheetFormat::from_mime(XLSX_MIME).unwrap(), SheetFormat::Xlsx);
        assert!(matches!(
            SheetFormat::from_mime("application/pdf"),
            Err(ImportError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SheetFormat::from_path(Path::new("leads.CSV")).unwrap(),
            SheetFormat::Csv
        );
        assert_eq!(
            SheetFormat::from_path(Path::new("/tmp/q3.xlsx")).unwrap(),
            SheetFormat::Xlsx
        );
        assert!(SheetFormat::from_path(Path::new("leads.xls")).is_err());
        assert!(SheetFormat::from_path(Path::new("leads")).is_err());
    }

    #[test]
    fn test_column_index_falls_back_to_case_insensitive() {
        let sheet = ParsedSheet {
            columns: vec!["Email".to_string(), "Name".to_string()],
            rows: vec![],
        };
        assert_eq!(sheet.column_index("Email"), Some(0));
        assert_eq!(sheet.column_index("name"), Some(1));
        assert_eq!(sheet.column_index("phone"), None);
    }

    #[test]
    fn test_auto_detect_maps_known_headers() {
        let columns: Vec<String> = ["E-mail", "Full Name", "Company", "Position", "Shoe size", "Email"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = ColumnMapping::auto_detect(&columns);

        assert_eq!(mapping.column_for(LeadField::Email), Some("E-mail"));
        assert_eq!(mapping.column_for(LeadField::Name), Some("Full Name"));
        assert_eq!(mapping.column_for(LeadField::Company), Some("Company"));
        assert_eq!(mapping.column_for(LeadField::JobTitle), Some("Position"));
        assert_eq!(mapping.fields.len(), 4);
    }

    #[test]
    fn test_merge_overrides_detected_column() {
        let mut mapping = ColumnMapping::new().with(LeadField::Email, "Email");
        mapping.merge(ColumnMapping::new().with(LeadField::Email, "Work Email"));
        assert_eq!(mapping.column_for(LeadField::Email), Some("Work Email"));
    }

    #[test]
    fn test_parse_assignment() {
        let (field, column) = ColumnMapping::parse_assignment("email=Work Email").unwrap();
        assert_eq!(field, LeadField::Email);
        assert_eq!(column, "Work Email");

        assert!(ColumnMapping::parse_assignment("email").is_err());
        assert!(ColumnMapping::parse_assignment("shoe_size=Shoe").is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = ImportSummary {
            total_rows: 5,
            imported: 3,
            duplicates: 1,
            invalid: 1,
            errors: vec![],
        };
        assert_eq!(
            summary.to_string(),
            "5 rows processed: 3 imported, 1 duplicates, 1 errors"
        );
    }
}
