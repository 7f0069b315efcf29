// JSON export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use poinv_recon::ReconResult;

use crate::error::RenderError;

/// Export the full reconciliation result (meta, summary, report rows) as
/// pretty-printed JSON.
pub fn write_json(result: &ReconResult, path: &Path) -> Result<(), RenderError> {
    let io_err = |e: std::io::Error| RenderError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, result)
        .map_err(|e| RenderError::Json(e.to_string()))?;
    writeln!(writer).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
