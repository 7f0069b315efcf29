use crate::model::{CanonicalField, DiscrepancyEntry, MatchResult, NormalizedTable, ReconSummary};

/// Compute summary statistics for one reconciliation run.
pub fn compute_summary(
    po: &NormalizedTable,
    invoices: &NormalizedTable,
    matches: &[MatchResult<'_>],
    entries: &[DiscrepancyEntry],
) -> ReconSummary {
    let matched = matches.iter().filter(|m| m.is_matched()).count();
    let field_mismatches = entries
        .iter()
        .filter(|e| matches!(e, DiscrepancyEntry::FieldMismatch { .. }))
        .count();

    ReconSummary {
        po_records: po.len(),
        invoice_records: invoices.len(),
        skipped_po_records: po.len() - matches.len(),
        matched,
        unmatched: matches.len() - matched,
        field_mismatches,
        header_collisions: po.headers.collisions.len() + invoices.headers.collisions.len(),
        dropped_headers: po.headers.dropped.len() + invoices.headers.dropped.len(),
        po_number_column_missing: !po.is_empty() && !po.has_field(CanonicalField::PoNumber),
    }
}
