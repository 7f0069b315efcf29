use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{MatchResult, NormalizedRecord, NormalizedTable};

/// First-occurrence index over invoice records by trimmed PO number.
struct InvoiceIndex<'a> {
    first: BTreeMap<String, (&'a NormalizedRecord, usize)>,
}

impl<'a> InvoiceIndex<'a> {
    fn build(invoices: &'a NormalizedTable) -> Self {
        let mut first: BTreeMap<String, (&'a NormalizedRecord, usize)> = BTreeMap::new();
        for rec in &invoices.records {
            if let Some(key) = rec.po_number_key() {
                first.entry(key).or_insert((rec, 0)).1 += 1;
            }
        }
        Self { first }
    }

    fn get(&self, key: &str) -> Option<(&'a NormalizedRecord, usize)> {
        self.first.get(key).copied()
    }
}

/// Pair each PO record with the first invoice record carrying the same PO
/// number.
///
/// PO records without a PO number are skipped entirely. Invoice records are
/// not consumed, so several PO records may share one invoice. Later invoices
/// with a duplicate PO number are ignored.
pub fn match_records<'a>(
    po: &'a NormalizedTable,
    invoices: &'a NormalizedTable,
) -> Vec<MatchResult<'a>> {
    let index = InvoiceIndex::build(invoices);
    let mut results = Vec::with_capacity(po.len());

    for po_rec in &po.records {
        let Some(key) = po_rec.po_number_key() else {
            debug!(row = po_rec.row, "PO record without PO number skipped");
            continue;
        };

        let invoice = match index.get(&key) {
            Some((inv, candidates)) => {
                if candidates > 1 {
                    debug!(
                        po_number = %key,
                        candidates,
                        invoice_row = inv.row,
                        "several invoices share this PO number; using the first"
                    );
                }
                Some(inv)
            }
            None => None,
        };

        results.push(MatchResult { po: po_rec, invoice });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasTable;
    use crate::model::{CanonicalField, CellValue, RawTable};
    use crate::normalize::normalize;

    fn po_table(keys: &[CellValue]) -> NormalizedTable {
        let rows = keys.iter().map(|k| vec![k.clone()]).collect();
        normalize(&RawTable::from_rows(&["po number"], rows), &AliasTable::default())
    }

    fn invoice_table(rows: &[(&str, CellValue)]) -> NormalizedTable {
        let rows = rows
            .iter()
            .map(|(inv, key)| vec![CellValue::from(*inv), key.clone()])
            .collect();
        normalize(
            &RawTable::from_rows(&["invoice number", "po number"], rows),
            &AliasTable::default(),
        )
    }

    fn invoice_no(m: &MatchResult<'_>) -> Option<String> {
        m.invoice
            .and_then(|r| r.get(CanonicalField::InvoiceNumber))
            .map(|v| v.display())
    }

    #[test]
    fn exact_key_match() {
        let po = po_table(&["PO1".into(), "PO2".into()]);
        let inv = invoice_table(&[("I9", "PO9".into()), ("I1", "PO1".into())]);
        let out = match_records(&po, &inv);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].po_number(), "PO1");
        assert_eq!(invoice_no(&out[0]).as_deref(), Some("I1"));
        assert_eq!(out[1].po_number(), "PO2");
        assert!(!out[1].is_matched());
    }

    #[test]
    fn keys_are_whitespace_trimmed() {
        let po = po_table(&[" PO1 ".into()]);
        let inv = invoice_table(&[("I1", "PO1\t".into())]);
        let out = match_records(&po, &inv);
        assert!(out[0].is_matched());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let po = po_table(&["po1".into()]);
        let inv = invoice_table(&[("I1", "PO1".into())]);
        let out = match_records(&po, &inv);
        assert!(!out[0].is_matched());
    }

    #[test]
    fn numeric_and_text_keys_compare_by_display_form() {
        let po = po_table(&[CellValue::number(1001.0)]);
        let inv = invoice_table(&[("I1", "1001".into())]);
        let out = match_records(&po, &inv);
        assert!(out[0].is_matched());
    }

    #[test]
    fn blank_or_missing_po_numbers_are_excluded() {
        let po = po_table(&[CellValue::Empty, "   ".into(), "PO1".into()]);
        let inv = invoice_table(&[("I1", CellValue::Empty)]);
        let out = match_records(&po, &inv);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].po.row, 2);
        assert!(!out[0].is_matched());

        // No PO number column at all: nothing to match.
        let no_key = normalize(
            &RawTable::from_rows(&["vendor"], vec![vec!["Acme".into()]]),
            &AliasTable::default(),
        );
        assert!(match_records(&no_key, &inv).is_empty());
    }

    #[test]
    fn first_invoice_wins_on_duplicate_po_number() {
        // Known limitation: duplicates are not reported as ambiguous.
        let po = po_table(&["PO1".into()]);
        let inv = invoice_table(&[("I1", "PO1".into()), ("I2", "PO1".into())]);
        let out = match_records(&po, &inv);
        assert_eq!(out.len(), 1);
        assert_eq!(invoice_no(&out[0]).as_deref(), Some("I1"));
    }

    #[test]
    fn invoices_are_not_consumed() {
        let po = po_table(&["PO3".into(), "PO3".into()]);
        let inv = invoice_table(&[("I3", "PO3".into())]);
        let out = match_records(&po, &inv);
        assert_eq!(out.len(), 2);
        assert!(std::ptr::eq(out[0].invoice.unwrap(), out[1].invoice.unwrap()));
    }
}
