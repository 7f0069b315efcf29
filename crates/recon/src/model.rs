use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};

/// Sentinel message emitted when reconciliation finds nothing to report.
pub const NO_DISCREPANCIES_MESSAGE: &str = "No discrepancies found!";

/// Issue label for a PO record with no invoice carrying the same PO number.
pub const NO_MATCHING_INVOICE: &str = "No matching invoice";

/// Issue label for a matched pair that disagrees on a compared field.
pub const FIELD_MISMATCH: &str = "Field mismatch";

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single extracted cell. `Empty` is a present-but-blank cell; a field that
/// is absent from a table altogether is represented by `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Text(String),
    Number(OrderedFloat<f64>),
    Empty,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    /// Empty cell, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Render for keys and reports. Integral numbers print without decimals.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                let n = n.into_inner();
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Empty => String::new(),
        }
    }

    /// Numeric reading of the cell: numbers as-is, text if it parses.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.into_inner()),
            Self::Text(s) => s.trim().replace(',', "").parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::number(n as f64)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(n.into_inner()),
            Self::Empty => serializer.serialize_str(""),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical schema
// ---------------------------------------------------------------------------

/// The closed set of fields the engine understands.
///
/// Declaration order is the alias scan order used by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    PoNumber,
    InvoiceNumber,
    Vendor,
    TotalAmount,
    Quantity,
    Currency,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        Self::PoNumber,
        Self::InvoiceNumber,
        Self::Vendor,
        Self::TotalAmount,
        Self::Quantity,
        Self::Currency,
    ];

    /// Comparison fields used when the config does not override them.
    pub const DEFAULT_COMPARE: [CanonicalField; 4] =
        [Self::TotalAmount, Self::Vendor, Self::Quantity, Self::Currency];

    /// Canonical header name. Always an implicit alias of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PoNumber => "po number",
            Self::InvoiceNumber => "invoice number",
            Self::Vendor => "vendor",
            Self::TotalAmount => "total amount",
            Self::Quantity => "quantity",
            Self::Currency => "currency",
        }
    }

    /// Config key (snake_case), as used in `[aliases]` and `compare`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::PoNumber => "po_number",
            Self::InvoiceNumber => "invoice_number",
            Self::Vendor => "vendor",
            Self::TotalAmount => "total_amount",
            Self::Quantity => "quantity",
            Self::Currency => "currency",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Fields that identify a record rather than describe it.
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::PoNumber | Self::InvoiceNumber)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A table as produced by document extraction: original headers plus rows of
/// cells aligned to them. A row shorter than the header list reads as `Empty`
/// in its trailing cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub source: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self { source: None, headers, rows: Vec::new() }
    }

    /// Build from string headers and pre-made rows.
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            source: None,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ---------------------------------------------------------------------------
// Normalized
// ---------------------------------------------------------------------------

/// One row projected onto the canonical schema. Fields the source table did
/// not carry are absent, never defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Zero-based data row index in the source table.
    pub row: usize,
    pub fields: BTreeMap<CanonicalField, CellValue>,
}

impl NormalizedRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&CellValue> {
        self.fields.get(&field)
    }

    /// Trimmed PO number, or `None` when missing or blank.
    pub fn po_number_key(&self) -> Option<String> {
        let key = self.get(CanonicalField::PoNumber)?.display().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

/// Several source headers resolved to the same canonical field. The last one
/// in column order supplies the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCollision {
    pub field: CanonicalField,
    pub headers: Vec<String>,
}

/// How each source header was treated by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderResolution {
    pub mapped: Vec<(String, CanonicalField)>,
    pub dropped: Vec<String>,
    pub collisions: Vec<HeaderCollision>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub records: Vec<NormalizedRecord>,
    pub headers: HeaderResolution,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_field(&self, field: CanonicalField) -> bool {
        self.headers.mapped.iter().any(|(_, f)| *f == field)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub po: &'a NormalizedRecord,
    pub invoice: Option<&'a NormalizedRecord>,
}

impl MatchResult<'_> {
    /// PO number of the PO side. Matcher output never carries a blank one.
    pub fn po_number(&self) -> String {
        self.po.po_number_key().unwrap_or_default()
    }

    pub fn is_matched(&self) -> bool {
        self.invoice.is_some()
    }
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscrepancyEntry {
    NoMatchingInvoice {
        po_number: String,
    },
    FieldMismatch {
        po_number: String,
        field: CanonicalField,
        po_value: Option<CellValue>,
        invoice_value: Option<CellValue>,
    },
}

impl DiscrepancyEntry {
    pub fn po_number(&self) -> &str {
        match self {
            Self::NoMatchingInvoice { po_number } | Self::FieldMismatch { po_number, .. } => {
                po_number
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportRow {
    Discrepancy(DiscrepancyEntry),
    Message { message: String },
}

/// Engine output. Holds at least one row: either discrepancies or the
/// "no discrepancies" sentinel. Only `report::assemble` builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyReport {
    pub(crate) rows: Vec<ReportRow>,
}

impl DiscrepancyReport {
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Discrepancy entries, empty when the report is the sentinel.
    pub fn entries(&self) -> impl Iterator<Item = &DiscrepancyEntry> {
        self.rows.iter().filter_map(|r| match r {
            ReportRow::Discrepancy(e) => Some(e),
            ReportRow::Message { .. } => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// Flat string table handed to report rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub po_records: usize,
    pub invoice_records: usize,
    /// PO records excluded from matching for lack of a PO number.
    pub skipped_po_records: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub field_mismatches: usize,
    pub header_collisions: usize,
    pub dropped_headers: usize,
    /// The PO table has rows but no column resolved to the PO number, so
    /// every record was skipped.
    pub po_number_column_missing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub report: DiscrepancyReport,
}

impl ReconResult {
    pub fn has_discrepancies(&self) -> bool {
        !self.report.is_clean()
    }
}
