//! `poinv run`, `poinv validate`, `poinv aliases`: PO/invoice reconciliation commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use poinv_io::{extract_table, render_report, ExtractError, ExtractOptions, RenderOptions};
use poinv_recon::{RawTable, ReconConfig, ReconEngine, ReconError, ReconResult};
use tracing::debug;

use crate::exit_codes::{
    EXIT_DISCREPANCIES, EXIT_EXTRACTION_FAILED, EXIT_INPUT_TOO_LARGE, EXIT_INVALID_CONFIG,
    EXIT_RENDER_FAILED, EXIT_USAGE,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a PO document against an invoice document (exit 0 = clean, exit 1 = discrepancies)
    #[command(after_help = "\
Examples:
  poinv run po.xlsx invoice.pdf
  poinv run po.csv invoice.csv --out-dir reports --name march-close
  poinv run po.xlsx invoice.xlsx --config erp.recon.toml --json --no-pdf
  poinv run po.pdf invoice.pdf --watermark 'ACME AP' -q")]
    Run {
        /// Purchase order document (pdf, xlsx, xls, xlsm, ods, csv, tsv, txt)
        po: PathBuf,

        /// Invoice document (same formats)
        invoice: PathBuf,

        /// Path to a .recon.toml alias/compare config (defaults built in)
        #[arg(long, short = 'c', env = "POINV_CONFIG")]
        config: Option<PathBuf>,

        /// Directory for report files
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,

        /// Report file stem (default: report_<uuid>)
        #[arg(long)]
        name: Option<String>,

        /// Watermark text for the xlsx banner and PDF pages
        #[arg(long, default_value = poinv_io::DEFAULT_WATERMARK)]
        watermark: String,

        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Skip the Excel report
        #[arg(long)]
        no_xlsx: bool,

        /// Skip the PDF report
        #[arg(long)]
        no_pdf: bool,

        /// Skip the JSON report file
        #[arg(long)]
        no_json_file: bool,

        /// Suppress the stderr summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  poinv validate erp.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Print the effective header alias table
    #[command(after_help = "\
Examples:
  poinv aliases
  poinv aliases --config erp.recon.toml --json")]
    Aliases {
        /// Path to a .recon.toml config file (defaults built in)
        #[arg(long, short = 'c', env = "POINV_CONFIG")]
        config: Option<PathBuf>,

        /// Output JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            po,
            invoice,
            config,
            out_dir,
            name,
            watermark,
            json,
            no_xlsx,
            no_pdf,
            no_json_file,
            quiet,
        } => {
            let render = RenderOptions {
                out_dir,
                stem: name,
                watermark,
                xlsx: !no_xlsx,
                pdf: !no_pdf,
                json: !no_json_file,
            };
            cmd_run(&po, &invoice, config.as_deref(), &render, json, quiet)
        }
        ReconCommands::Validate { config } => cmd_validate(&config),
        ReconCommands::Aliases { config, json } => cmd_aliases(config.as_deref(), json),
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn recon_error(err: ReconError) -> CliError {
    match &err {
        ReconError::ConfigParse(_) | ReconError::ConfigInvalid(_) => {
            CliError::new(EXIT_INVALID_CONFIG, err.to_string())
        }
        ReconError::InputTooLarge { .. } => CliError::new(EXIT_INPUT_TOO_LARGE, err.to_string())
            .with_hint("raise [limits] max_rows in the config, or split the document"),
    }
}

fn extract_error(err: ExtractError) -> CliError {
    let hint = match &err {
        ExtractError::ScannedPdf { .. } => {
            Some("run OCR first, or export the document as xlsx/csv")
        }
        ExtractError::TooLarge { .. } => Some("raise [limits] max_file_bytes in the config"),
        ExtractError::UnsupportedFormat { .. } => Some("convert the document to pdf, xlsx or csv"),
        _ => None,
    };
    let cli = CliError::new(EXIT_EXTRACTION_FAILED, err.to_string());
    match hint {
        Some(h) => cli.with_hint(h),
        None => cli,
    }
}

/// Load a config file, or the built-in defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_USAGE, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = ReconConfig::from_toml(&text).map_err(recon_error)?;
    debug!(path = %path.display(), name = %config.name, "config loaded");
    Ok(config)
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    po_path: &Path,
    invoice_path: &Path,
    config_path: Option<&Path>,
    render: &RenderOptions,
    json_output: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let extract = ExtractOptions { max_file_bytes: config.limits.max_file_bytes };
    let engine = ReconEngine::new(config).map_err(recon_error)?;

    // Both documents must extract before the engine sees either.
    let po: RawTable = extract_table(po_path, &extract).map_err(extract_error)?;
    let invoices: RawTable = extract_table(invoice_path, &extract).map_err(extract_error)?;

    let result = engine.run(&po, &invoices).map_err(recon_error)?;

    let artifacts = render_report(&result, render)
        .map_err(|e| CliError::new(EXIT_RENDER_FAILED, e.to_string()))?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| {
            CliError::new(EXIT_RENDER_FAILED, format!("JSON serialization error: {e}"))
        })?;
        println!("{json_str}");
    }

    if !quiet {
        print_summary(&result);
        for path in artifacts.paths() {
            eprintln!("wrote {}", path.display());
        }
    }

    if result.has_discrepancies() {
        return Err(CliError::silent(EXIT_DISCREPANCIES));
    }
    Ok(())
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{} PO rows vs {} invoice rows: {} matched, {} without invoice, {} field mismatches",
        s.po_records, s.invoice_records, s.matched, s.unmatched, s.field_mismatches,
    );
    if s.po_number_column_missing {
        eprintln!(
            "warning: no PO document column maps to po_number; all {} PO rows were skipped \
             (check the headers with `poinv aliases`)",
            s.po_records
        );
    } else if s.skipped_po_records > 0 {
        eprintln!("note: {} PO rows had no PO number and were skipped", s.skipped_po_records);
    }
    if s.header_collisions > 0 {
        eprintln!(
            "warning: {} header collisions (several columns map to one field; last column used)",
            s.header_collisions
        );
    }
    if result.report.is_clean() {
        eprintln!("{}", poinv_recon::model::NO_DISCREPANCIES_MESSAGE);
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(config_path))?;
    let compare: Vec<&str> = config.compare.iter().map(|f| f.key()).collect();
    eprintln!("ok: \"{}\" compares {}", config.name, compare.join(", "));
    if let Some(tol) = config.tolerance.numeric {
        eprintln!("numeric tolerance: {tol}");
    }
    Ok(())
}

// ============================================================================
// aliases
// ============================================================================

fn cmd_aliases(config_path: Option<&Path>, json_output: bool) -> Result<(), CliError> {
    let config = load_config(config_path)?;

    if json_output {
        let mut map = serde_json::Map::new();
        for (field, aliases) in config.aliases.iter() {
            map.insert(field.key().to_string(), serde_json::json!(aliases));
        }
        let value = serde_json::json!({
            "name": config.name,
            "aliases": map,
            "compare": config.compare.iter().map(|f| f.key()).collect::<Vec<_>>(),
        });
        let out = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::args(format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let width = config.aliases.iter().map(|(f, _)| f.key().len()).max().unwrap_or(0);
    for (field, aliases) in config.aliases.iter() {
        let marker = if config.compare.contains(&field) { "*" } else { " " };
        println!("{marker} {:<width$}  {}", field.key(), aliases.join(", "));
    }
    println!();
    println!("* compared field");
    Ok(())
}
