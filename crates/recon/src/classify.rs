use crate::config::ToleranceConfig;
use crate::model::{CanonicalField, CellValue, DiscrepancyEntry, MatchResult};

/// Classify one match result into discrepancy entries.
///
/// Unmatched PO records yield a single `NoMatchingInvoice`. Matched pairs are
/// compared field by field in `compare` order; each inequality yields one
/// `FieldMismatch`. Identifier fields are never compared.
pub fn classify(
    result: &MatchResult<'_>,
    compare: &[CanonicalField],
    tolerance: &ToleranceConfig,
) -> Vec<DiscrepancyEntry> {
    let po_number = result.po_number();

    let Some(invoice) = result.invoice else {
        return vec![DiscrepancyEntry::NoMatchingInvoice { po_number }];
    };

    compare
        .iter()
        .filter(|f| !f.is_identifier())
        .filter_map(|&field| {
            let po_value = result.po.get(field);
            let invoice_value = invoice.get(field);
            if values_equal(po_value, invoice_value, tolerance) {
                None
            } else {
                Some(DiscrepancyEntry::FieldMismatch {
                    po_number: po_number.clone(),
                    field,
                    po_value: po_value.cloned(),
                    invoice_value: invoice_value.cloned(),
                })
            }
        })
        .collect()
}

/// Three-state equality: a missing field only equals another missing field;
/// `Empty` is a present value. With a numeric tolerance configured, two
/// values that both read as numbers compare within it.
pub fn values_equal(
    po: Option<&CellValue>,
    invoice: Option<&CellValue>,
    tolerance: &ToleranceConfig,
) -> bool {
    match (po, invoice) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if a == b {
                return true;
            }
            match (tolerance.numeric, a.as_f64(), b.as_f64()) {
                (Some(tol), Some(x), Some(y)) => (x - y).abs() <= tol,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::model::NormalizedRecord;

    fn record(row: usize, fields: &[(CanonicalField, CellValue)]) -> NormalizedRecord {
        NormalizedRecord {
            row,
            fields: fields.iter().cloned().collect::<BTreeMap<_, _>>(),
        }
    }

    fn exact() -> ToleranceConfig {
        ToleranceConfig::default()
    }

    use CanonicalField::*;

    #[test]
    fn unmatched_yields_single_entry() {
        let po = record(0, &[(PoNumber, "PO2".into()), (Vendor, "Acme".into())]);
        let out = classify(
            &MatchResult { po: &po, invoice: None },
            &CanonicalField::DEFAULT_COMPARE,
            &exact(),
        );
        assert_eq!(
            out,
            vec![DiscrepancyEntry::NoMatchingInvoice { po_number: "PO2".into() }]
        );
    }

    #[test]
    fn vendor_mismatch_only() {
        let po = record(
            0,
            &[(PoNumber, "PO1".into()), (Vendor, "Acme".into()), (TotalAmount, 100i64.into())],
        );
        let inv = record(
            0,
            &[
                (InvoiceNumber, "I1".into()),
                (PoNumber, "PO1".into()),
                (Vendor, "Acme Corp".into()),
                (TotalAmount, 100i64.into()),
            ],
        );
        let out = classify(
            &MatchResult { po: &po, invoice: Some(&inv) },
            &CanonicalField::DEFAULT_COMPARE,
            &exact(),
        );
        assert_eq!(
            out,
            vec![DiscrepancyEntry::FieldMismatch {
                po_number: "PO1".into(),
                field: Vendor,
                po_value: Some("Acme".into()),
                invoice_value: Some("Acme Corp".into()),
            }]
        );
    }

    #[test]
    fn entries_follow_compare_order() {
        let po = record(
            0,
            &[
                (PoNumber, "PO1".into()),
                (Vendor, "A".into()),
                (TotalAmount, 1i64.into()),
                (Quantity, 1i64.into()),
                (Currency, "USD".into()),
            ],
        );
        let inv = record(
            0,
            &[
                (PoNumber, "PO1".into()),
                (Vendor, "B".into()),
                (TotalAmount, 2i64.into()),
                (Quantity, 2i64.into()),
                (Currency, "EUR".into()),
            ],
        );
        let out = classify(
            &MatchResult { po: &po, invoice: Some(&inv) },
            &CanonicalField::DEFAULT_COMPARE,
            &exact(),
        );
        let fields: Vec<_> = out
            .iter()
            .map(|e| match e {
                DiscrepancyEntry::FieldMismatch { field, .. } => *field,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(fields, vec![TotalAmount, Vendor, Quantity, Currency]);
    }

    #[test]
    fn identifiers_never_compared() {
        let po = record(0, &[(PoNumber, "PO1".into()), (InvoiceNumber, "X".into())]);
        let inv = record(0, &[(PoNumber, "PO1".into()), (InvoiceNumber, "Y".into())]);
        let out = classify(
            &MatchResult { po: &po, invoice: Some(&inv) },
            &[InvoiceNumber, PoNumber],
            &exact(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn missing_is_distinct_from_empty() {
        assert!(values_equal(None, None, &exact()));
        assert!(!values_equal(None, Some(&CellValue::Empty), &exact()));
        assert!(!values_equal(Some(&CellValue::Empty), None, &exact()));
        assert!(values_equal(Some(&CellValue::Empty), Some(&CellValue::Empty), &exact()));
    }

    #[test]
    fn field_missing_on_one_side_is_reported() {
        let po = record(0, &[(PoNumber, "PO1".into()), (Quantity, 5i64.into())]);
        let inv = record(0, &[(PoNumber, "PO1".into())]);
        let out = classify(
            &MatchResult { po: &po, invoice: Some(&inv) },
            &[Quantity],
            &exact(),
        );
        assert_eq!(
            out,
            vec![DiscrepancyEntry::FieldMismatch {
                po_number: "PO1".into(),
                field: Quantity,
                po_value: Some(CellValue::number(5.0)),
                invoice_value: None,
            }]
        );
    }

    #[test]
    fn numbers_compare_as_extracted_by_default() {
        let n = CellValue::number(100.0);
        let t = CellValue::from("100");
        assert!(!values_equal(Some(&n), Some(&t), &exact()));
        assert!(!values_equal(
            Some(&CellValue::number(100.0)),
            Some(&CellValue::number(100.001)),
            &exact()
        ));
    }

    #[test]
    fn numeric_tolerance_extension() {
        let tol = ToleranceConfig { numeric: Some(0.01) };
        assert!(values_equal(
            Some(&CellValue::number(100.0)),
            Some(&CellValue::from("100.005")),
            &tol
        ));
        assert!(values_equal(
            Some(&CellValue::from("1,000.00")),
            Some(&CellValue::number(1000.0)),
            &tol
        ));
        assert!(!values_equal(
            Some(&CellValue::number(100.0)),
            Some(&CellValue::number(100.5)),
            &tol
        ));
        // Text never becomes equal through tolerance.
        assert!(!values_equal(
            Some(&CellValue::from("Acme")),
            Some(&CellValue::from("ACME")),
            &tol
        ));
    }
}
