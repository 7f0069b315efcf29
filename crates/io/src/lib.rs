// File I/O: purchase order / invoice extraction and report rendering

pub mod csv;
pub mod error;
pub mod extract;
pub mod json;
pub mod pdf;
pub mod render;
pub mod xlsx;

pub use error::{ExtractError, RenderError};
pub use extract::{extract_table, DocumentFormat, ExtractOptions};
pub use json::write_json;
pub use pdf::write_pdf;
pub use render::{new_report_stem, render_report, RenderOptions, ReportArtifacts, DEFAULT_WATERMARK};
pub use xlsx::write_xlsx;
