// Report rendering: one ReconResult -> xlsx / pdf / json files

use std::path::{Path, PathBuf};

use poinv_recon::ReconResult;
use tracing::info;

use crate::error::RenderError;

pub const DEFAULT_WATERMARK: &str = "Discrepancy Detector";

/// Fresh report file stem, `report_<uuid>`.
pub fn new_report_stem() -> String {
    format!("report_{}", uuid::Uuid::new_v4().simple())
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub out_dir: PathBuf,
    /// File stem shared by every artifact. `None` picks a fresh one.
    pub stem: Option<String>,
    pub watermark: String,
    pub xlsx: bool,
    pub pdf: bool,
    pub json: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            stem: None,
            watermark: DEFAULT_WATERMARK.to_string(),
            xlsx: true,
            pdf: true,
            json: true,
        }
    }
}

/// Paths of the files one render produced.
#[derive(Debug, Clone, Default)]
pub struct ReportArtifacts {
    pub stem: String,
    pub xlsx: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl ReportArtifacts {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.xlsx, &self.pdf, &self.json]
            .into_iter()
            .filter_map(|p| p.as_deref())
    }
}

/// Write every enabled artifact under `options.out_dir`, creating the
/// directory if needed.
pub fn render_report(
    result: &ReconResult,
    options: &RenderOptions,
) -> Result<ReportArtifacts, RenderError> {
    std::fs::create_dir_all(&options.out_dir).map_err(|e| RenderError::Io {
        path: options.out_dir.clone(),
        reason: e.to_string(),
    })?;

    let stem = options.stem.clone().unwrap_or_else(new_report_stem);
    let mut artifacts = ReportArtifacts { stem: stem.clone(), ..Default::default() };
    let table = result.report.to_table();

    if options.xlsx {
        let path = options.out_dir.join(format!("{stem}.xlsx"));
        crate::xlsx::write_xlsx(&table, &path, &options.watermark)?;
        artifacts.xlsx = Some(path);
    }
    if options.pdf {
        let path = options.out_dir.join(format!("{stem}.pdf"));
        crate::pdf::write_pdf(&table, &path, &options.watermark)?;
        artifacts.pdf = Some(path);
    }
    if options.json {
        let path = options.out_dir.join(format!("{stem}.json"));
        crate::json::write_json(result, &path)?;
        artifacts.json = Some(path);
    }

    info!(
        out_dir = %options.out_dir.display(),
        stem = %stem,
        files = artifacts.paths().count(),
        "report rendered"
    );
    Ok(artifacts)
}
