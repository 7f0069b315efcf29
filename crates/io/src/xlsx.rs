// Excel import (xlsx, xls, xlsm, xlsb, ods) and report export (xlsx only)
//
// Import reads the first worksheet. Export writes a single "Report" sheet:
// row 1 carries the watermark banner, row 2 the column headers.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use poinv_recon::{CellValue, RawTable, ReportTable};
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::error::RenderError;
use crate::extract::{infer_cell, is_blank_row};

pub const REPORT_SHEET_NAME: &str = "Report";

/// Import the first worksheet. `Ok(None)` when the sheet has no non-blank row.
pub fn read_table(path: &Path) -> Result<Option<RawTable>, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err("Excel file contains no sheets".to_string());
    };
    if sheet_names.len() > 1 {
        debug!(sheet = %first, ignored = sheet_names.len() - 1, "reading first worksheet only");
    }

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format!("failed to read sheet '{}': {}", first, e))?;

    let mut table: Option<RawTable> = None;
    for row in range.rows() {
        let cells: Vec<CellValue> = row.iter().map(convert_cell).collect();
        if is_blank_row(&cells) {
            continue;
        }
        match table.as_mut() {
            None => table = Some(RawTable::new(cells.iter().map(|c| c.display()).collect())),
            Some(t) => t.push_row(cells),
        }
    }
    Ok(table)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(s.as_str())
            }
        }
        Data::Float(n) => CellValue::number(*n),
        Data::Int(n) => CellValue::number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::text(format!("#{:?}", e)),
        // Date serials compare as numbers; formatting is the sheet's concern.
        Data::DateTime(dt) => CellValue::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => infer_cell(s),
    }
}

/// Export the report table as a one-sheet workbook.
pub fn write_xlsx(table: &ReportTable, path: &Path, watermark: &str) -> Result<(), RenderError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(REPORT_SHEET_NAME)
        .map_err(|e| RenderError::Xlsx(format!("failed to create sheet: {}", e)))?;

    let header_row: u32 = if watermark.is_empty() {
        0
    } else {
        worksheet
            .write_string_with_format(0, 0, watermark, &bold)
            .map_err(|e| RenderError::Xlsx(format!("failed to write watermark: {}", e)))?;
        1
    };

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(header_row, col as u16, name, &bold)
            .map_err(|e| RenderError::Xlsx(format!("failed to write header: {}", e)))?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row32 = header_row + 1 + i as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string(row32, col as u16, value)
                .map_err(|e| RenderError::Xlsx(format!("failed to write cell: {}", e)))?;
        }
    }

    for col in 0..table.columns.len() {
        let width = std::iter::once(&table.columns[col])
            .chain(table.rows.iter().filter_map(|r| r.get(col)))
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(8)
            .clamp(8, 60);
        worksheet
            .set_column_width(col as u16, width as f64 + 2.0)
            .map_err(|e| RenderError::Xlsx(format!("failed to size column: {}", e)))?;
    }

    workbook
        .save(path)
        .map_err(|e| RenderError::Xlsx(format!("failed to save XLSX file: {}", e)))?;

    debug!(path = %path.display(), rows = table.rows.len(), "XLSX report written");
    Ok(())
}
