use std::fmt;
use std::path::PathBuf;

/// Document extraction failure. Every variant is an "extraction failed"
/// condition: the engine never runs on a document that produced one.
#[derive(Debug)]
pub enum ExtractError {
    /// The path does not exist or is not a file.
    NotFound { path: PathBuf },
    /// The extension is not one of the supported document formats.
    UnsupportedFormat { path: PathBuf, extension: String },
    /// The file exceeds the configured byte limit.
    TooLarge { path: PathBuf, bytes: u64, limit: u64 },
    /// The file could not be opened or parsed.
    Unreadable { path: PathBuf, reason: String },
    /// The PDF holds page images and no extractable text.
    ScannedPdf { path: PathBuf },
    /// No header row could be found.
    NoHeader { path: PathBuf },
}

impl ExtractError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotFound { path }
            | Self::UnsupportedFormat { path, .. }
            | Self::TooLarge { path, .. }
            | Self::Unreadable { path, .. }
            | Self::ScannedPdf { path }
            | Self::NoHeader { path } => path,
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extraction failed: ")?;
        match self {
            Self::NotFound { path } => write!(f, "{}: no such file", path.display()),
            Self::UnsupportedFormat { path, extension } => write!(
                f,
                "{}: unsupported file type '{extension}' (expected pdf, xlsx, xls, xlsm, ods, csv, tsv or txt)",
                path.display()
            ),
            Self::TooLarge { path, bytes, limit } => {
                write!(f, "{}: {bytes} bytes exceeds the {limit} byte limit", path.display())
            }
            Self::Unreadable { path, reason } => write!(f, "{}: {reason}", path.display()),
            Self::ScannedPdf { path } => write!(
                f,
                "{}: PDF appears scanned/image-only, no text to extract",
                path.display()
            ),
            Self::NoHeader { path } => write!(f, "{}: no header row found", path.display()),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Report rendering failure.
#[derive(Debug)]
pub enum RenderError {
    Io { path: PathBuf, reason: String },
    Xlsx(String),
    Pdf(String),
    Json(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "cannot write {}: {reason}", path.display()),
            Self::Xlsx(msg) => write!(f, "xlsx render error: {msg}"),
            Self::Pdf(msg) => write!(f, "pdf render error: {msg}"),
            Self::Json(msg) => write!(f, "JSON serialization error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}
