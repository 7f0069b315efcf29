//! `poinv-recon`: PO/invoice reconciliation engine.
//!
//! Pure engine crate: receives pre-extracted tables, returns the discrepancy
//! report. No CLI or IO dependencies.
//!
//! Pipeline: [`normalize`](normalize::normalize) headers onto the canonical
//! schema, [`match_records`](matcher::match_records) by PO number,
//! [`classify`](classify::classify) each pair, [`assemble`](report::assemble)
//! the report.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod summary;

pub use config::{AliasTable, ReconConfig};
pub use engine::{run, ReconEngine};
pub use error::ReconError;
pub use model::{
    CanonicalField, CellValue, DiscrepancyEntry, DiscrepancyReport, RawTable, ReconResult,
    ReportTable,
};
