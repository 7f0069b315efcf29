use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::matcher::match_records;
use crate::model::{RawTable, ReconMeta, ReconResult};
use crate::normalize::normalize;
use crate::report::assemble;
use crate::summary::compute_summary;

/// A configured reconciliation engine.
///
/// Holds only validated, immutable configuration, so one engine can serve
/// any number of runs, from any number of threads.
#[derive(Debug, Clone)]
pub struct ReconEngine {
    config: ReconConfig,
}

impl ReconEngine {
    /// Validate `config` and build an engine. Invalid configuration fails
    /// here, never at run time.
    pub fn new(config: ReconConfig) -> Result<Self, ReconError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Reconcile a PO table against an invoice table.
    ///
    /// The only failure is a table over `limits.max_rows`; malformed tables
    /// degrade into fewer matches or more discrepancies.
    pub fn run(&self, po: &RawTable, invoices: &RawTable) -> Result<ReconResult, ReconError> {
        self.check_size("po", po)?;
        self.check_size("invoice", invoices)?;

        let po_norm = normalize(po, &self.config.aliases);
        let inv_norm = normalize(invoices, &self.config.aliases);
        debug!(
            po_records = po_norm.len(),
            invoice_records = inv_norm.len(),
            "tables normalized"
        );

        let matches = match_records(&po_norm, &inv_norm);

        let entries: Vec<_> = matches
            .iter()
            .flat_map(|m| classify(m, &self.config.compare, &self.config.tolerance))
            .collect();

        let summary = compute_summary(&po_norm, &inv_norm, &matches, &entries);
        if summary.po_number_column_missing {
            warn!(
                headers = ?po.headers,
                "no PO table column maps to po_number; every PO row was skipped"
            );
        }
        info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            field_mismatches = summary.field_mismatches,
            skipped = summary.skipped_po_records,
            "reconciliation complete"
        );

        Ok(ReconResult {
            meta: ReconMeta {
                config_name: self.config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            report: assemble(entries),
        })
    }

    fn check_size(&self, role: &str, table: &RawTable) -> Result<(), ReconError> {
        let limit = self.config.limits.max_rows;
        if table.len() > limit {
            return Err(ReconError::InputTooLarge {
                role: role.to_string(),
                rows: table.len(),
                limit,
            });
        }
        Ok(())
    }
}

/// Run reconciliation per config. Returns the report + summary.
pub fn run(
    config: &ReconConfig,
    po: &RawTable,
    invoices: &RawTable,
) -> Result<ReconResult, ReconError> {
    ReconEngine::new(config.clone())?.run(po, invoices)
}
