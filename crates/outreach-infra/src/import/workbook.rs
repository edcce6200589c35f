//! XLSX reader. Only the first worksheet is read.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use outreach_types::error::ImportError;
use outreach_types::import::ParsedSheet;

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedSheet, ImportError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ImportError::Parse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::Empty)?
        .map_err(|e| ImportError::Parse(e.to_string()))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let cells = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    to_sheet(cells, first_row + 1)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Build a sheet from rectangular cell text. `first_line` is the 1-based
/// worksheet row of the header.
///
/// The used range is always rectangular, so trailing empty cells are
/// dropped before comparing a row's width with the header's.
fn to_sheet(cells: Vec<Vec<String>>, first_line: usize) -> Result<ParsedSheet, ImportError> {
    let mut lines = cells.into_iter().enumerate();

    let columns = match lines.next() {
        Some((_, header)) => trim_trailing(header),
        None => return Err(ImportError::Empty),
    };
    if columns.is_empty() {
        return Err(ImportError::Empty);
    }

    let mut rows = Vec::new();
    for (offset, cells) in lines {
        let mut row = trim_trailing(cells);
        if row.is_empty() {
            continue;
        }
        if row.len() > columns.len() {
            return Err(ImportError::ColumnCount {
                row: first_line + offset,
            });
        }
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    Ok(ParsedSheet { columns, rows })
}

fn trim_trailing(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}
