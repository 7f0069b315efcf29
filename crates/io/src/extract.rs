// Document extraction: file on disk -> RawTable
//
// Format is chosen by extension. Each reader returns the first non-blank row
// as headers and every later non-blank row as data.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use poinv_recon::config::DEFAULT_MAX_FILE_BYTES;
use poinv_recon::{CellValue, RawTable};
use regex::Regex;
use tracing::{debug, info};

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Spreadsheet,
    Delimited,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Delimited => "delimited",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Files larger than this are refused before any parsing.
    pub max_file_bytes: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { max_file_bytes: DEFAULT_MAX_FILE_BYTES }
    }
}

/// Read a purchase order or invoice document into a raw table.
pub fn extract_table(path: &Path, options: &ExtractOptions) -> Result<RawTable, ExtractError> {
    let meta = std::fs::metadata(path).map_err(|_| ExtractError::NotFound {
        path: path.to_path_buf(),
    })?;
    if !meta.is_file() {
        return Err(ExtractError::NotFound { path: path.to_path_buf() });
    }

    let format = DocumentFormat::from_path(path).ok_or_else(|| ExtractError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string(),
    })?;

    if meta.len() > options.max_file_bytes {
        return Err(ExtractError::TooLarge {
            path: path.to_path_buf(),
            bytes: meta.len(),
            limit: options.max_file_bytes,
        });
    }

    debug!(path = %path.display(), format = format.name(), bytes = meta.len(), "extracting");

    let table = match format {
        DocumentFormat::Spreadsheet => crate::xlsx::read_table(path).map_err(|e| unreadable(path, e))?,
        DocumentFormat::Delimited => {
            let bytes = std::fs::read(path).map_err(|e| unreadable(path, e.to_string()))?;
            let content = crate::csv::decode_text(bytes);
            let delimiter = crate::csv::sniff_delimiter(&content);
            crate::csv::parse_table(&content, delimiter).map_err(|e| unreadable(path, e))?
        }
        DocumentFormat::Pdf => {
            let bytes = std::fs::read(path).map_err(|e| unreadable(path, e.to_string()))?;
            match crate::pdf::extract_lines(&bytes) {
                crate::pdf::PdfContent::Lines(lines) => crate::pdf::lines_to_table(&lines),
                crate::pdf::PdfContent::ScannedImage => {
                    return Err(ExtractError::ScannedPdf { path: path.to_path_buf() })
                }
                crate::pdf::PdfContent::Error(reason) => return Err(unreadable(path, reason)),
            }
        }
    };

    let table = table.ok_or_else(|| ExtractError::NoHeader { path: path.to_path_buf() })?;
    let table = table.with_source(path.display().to_string());

    info!(
        path = %path.display(),
        format = format.name(),
        rows = table.len(),
        columns = table.headers.len(),
        "document extracted"
    );
    Ok(table)
}

fn unreadable(path: &Path, reason: String) -> ExtractError {
    ExtractError::Unreadable { path: PathBuf::from(path), reason }
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(0|[1-9]\d*)(\.\d+)?$").expect("valid regex"))
}

/// Type a text cell: plain decimal numbers become `Number`, blanks become
/// `Empty`, everything else stays text (untrimmed). Values with leading
/// zeros such as `"0042"` stay text so identifiers keep their shape.
pub fn infer_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if number_pattern().is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::number(n);
            }
        }
    }
    CellValue::text(raw)
}

pub(crate) fn is_blank_row(cells: &[CellValue]) -> bool {
    cells.iter().all(|c| c.is_blank())
}
