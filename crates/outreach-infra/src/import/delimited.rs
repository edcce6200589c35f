//! CSV reader.

use outreach_types::error::ImportError;
use outreach_types::import::ParsedSheet;

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedSheet, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(parse_err)?,
        None => return Err(ImportError::Empty),
    };
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(parse_err)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != columns.len() {
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows.len() + 2);
            return Err(ImportError::ColumnCount { row });
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(ParsedSheet { columns, rows })
}

fn parse_err(e: csv::Error) -> ImportError {
    ImportError::Parse(e.to_string())
}
