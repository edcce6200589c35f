//! Lead file readers.
//!
//! Turns CSV and XLSX bytes into a [`ParsedSheet`]: the first row is the
//! header, and every data row must be exactly as wide as the header.
//! Column mapping and validation happen later, in `outreach_core::import`.

mod delimited;
mod workbook;

use std::path::Path;

use outreach_types::error::ImportError;
use outreach_types::import::{ParsedSheet, SheetFormat};

/// Read and parse a lead file, detecting the format from its extension.
pub async fn parse_file(path: &Path) -> Result<ParsedSheet, ImportError> {
    let format = SheetFormat::from_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImportError::Io(format!("{}: {e}", path.display())))?;

    let sheet = parse_bytes(&bytes, format)?;
    tracing::debug!(
        path = %path.display(),
        %format,
        columns = sheet.columns.len(),
        rows = sheet.rows.len(),
        "lead file parsed"
    );
    Ok(sheet)
}

/// Parse an in-memory lead file.
pub fn parse_bytes(bytes: &[u8], format: SheetFormat) -> Result<ParsedSheet, ImportError> {
    match format {
        SheetFormat::Csv => delimited::parse(bytes),
        SheetFormat::Xlsx => workbook::parse(bytes),
    }
}
