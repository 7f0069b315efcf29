use std::path::PathBuf;

use poinv_recon::model::{ReportRow, NO_DISCREPANCIES_MESSAGE};
use poinv_recon::{
    run, CanonicalField, CellValue, DiscrepancyEntry, RawTable, ReconConfig, ReconEngine,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn default_run(po: &RawTable, inv: &RawTable) -> poinv_recon::ReconResult {
    run(&ReconConfig::default(), po, inv).unwrap()
}

fn entries(result: &poinv_recon::ReconResult) -> Vec<DiscrepancyEntry> {
    result.report.entries().cloned().collect()
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn scenario_a_vendor_mismatch() {
    let po = RawTable::from_rows(
        &["po number", "vendor", "total amount"],
        vec![vec!["PO1".into(), "Acme".into(), 100i64.into()]],
    );
    let inv = RawTable::from_rows(
        &["invoice number", "po number", "vendor", "total amount"],
        vec![vec!["I1".into(), "PO1".into(), "Acme Corp".into(), 100i64.into()]],
    );

    let result = default_run(&po, &inv);

    assert_eq!(
        entries(&result),
        vec![DiscrepancyEntry::FieldMismatch {
            po_number: "PO1".into(),
            field: CanonicalField::Vendor,
            po_value: Some("Acme".into()),
            invoice_value: Some("Acme Corp".into()),
        }]
    );
    assert_eq!(result.summary.matched, 1);
    assert_eq!(result.summary.field_mismatches, 1);
}

#[test]
fn scenario_b_no_matching_invoice() {
    let po = RawTable::from_rows(&["po number"], vec![vec!["PO2".into()]]);
    let inv = RawTable::from_rows(
        &["invoice number", "po number"],
        vec![vec!["I7".into(), "PO7".into()]],
    );

    let result = default_run(&po, &inv);

    assert_eq!(
        entries(&result),
        vec![DiscrepancyEntry::NoMatchingInvoice { po_number: "PO2".into() }]
    );
    assert_eq!(result.summary.unmatched, 1);
}

#[test]
fn scenario_c_identical_rows_yield_sentinel() {
    let headers = ["PO Number", "Supplier", "Amount", "Qty", "Curr"];
    let row = vec![
        CellValue::from("PO5"),
        "Acme".into(),
        CellValue::number(250.5),
        CellValue::number(3.0),
        "USD".into(),
    ];
    let po = RawTable::from_rows(&headers, vec![row.clone()]);
    let inv = RawTable::from_rows(&headers, vec![row]);

    let result = default_run(&po, &inv);

    assert!(result.report.is_clean());
    assert_eq!(
        result.report.rows(),
        &[ReportRow::Message { message: NO_DISCREPANCIES_MESSAGE.into() }]
    );
    assert_eq!(result.report.to_table().rows, vec![vec!["No discrepancies found!"]]);
}

#[test]
fn scenario_d_duplicate_po_rows_share_one_invoice() {
    let po = RawTable::from_rows(
        &["po number", "vendor"],
        vec![
            vec!["PO3".into(), "Acme".into()],
            vec!["PO3".into(), "Globex".into()],
        ],
    );
    let inv = RawTable::from_rows(
        &["po number", "vendor"],
        vec![vec!["PO3".into(), "Initech".into()]],
    );

    let result = default_run(&po, &inv);

    assert_eq!(result.summary.matched, 2);
    assert_eq!(
        entries(&result),
        vec![
            DiscrepancyEntry::FieldMismatch {
                po_number: "PO3".into(),
                field: CanonicalField::Vendor,
                po_value: Some("Acme".into()),
                invoice_value: Some("Initech".into()),
            },
            DiscrepancyEntry::FieldMismatch {
                po_number: "PO3".into(),
                field: CanonicalField::Vendor,
                po_value: Some("Globex".into()),
                invoice_value: Some("Initech".into()),
            },
        ]
    );
}

// -------------------------------------------------------------------------
// Edge cases
// -------------------------------------------------------------------------

#[test]
fn duplicate_invoice_po_numbers_first_wins_silently() {
    // Known limitation kept for compatibility: the second invoice for PO4 is
    // never consulted and nothing in the report mentions it.
    let po = RawTable::from_rows(
        &["po number", "total amount"],
        vec![vec!["PO4".into(), 10i64.into()]],
    );
    let inv = RawTable::from_rows(
        &["po number", "total amount"],
        vec![
            vec!["PO4".into(), 10i64.into()],
            vec!["PO4".into(), 99i64.into()],
        ],
    );

    let result = default_run(&po, &inv);
    assert!(result.report.is_clean());
}

#[test]
fn missing_po_number_column_degrades_gracefully() {
    let po = RawTable::from_rows(&["vendor"], vec![vec!["Acme".into()]]);
    let inv = RawTable::from_rows(&["po number"], vec![vec!["PO1".into()]]);

    let result = default_run(&po, &inv);
    assert!(result.report.is_clean());
    assert_eq!(result.summary.skipped_po_records, 1);
}

#[test]
fn missing_invoice_columns_report_every_compared_field() {
    let po = RawTable::from_rows(
        &["po number", "vendor", "total", "quantity", "currency"],
        vec![vec!["PO1".into(), "Acme".into(), 5i64.into(), 1i64.into(), "USD".into()]],
    );
    let inv = RawTable::from_rows(&["purchase order"], vec![vec!["PO1".into()]]);

    let result = default_run(&po, &inv);
    let fields: Vec<_> = result
        .report
        .entries()
        .map(|e| match e {
            DiscrepancyEntry::FieldMismatch { field, invoice_value, .. } => {
                assert!(invoice_value.is_none());
                *field
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        fields,
        vec![
            CanonicalField::TotalAmount,
            CanonicalField::Vendor,
            CanonicalField::Quantity,
            CanonicalField::Currency,
        ]
    );
}

#[test]
fn report_order_follows_po_table_then_field_order() {
    let po = RawTable::from_rows(
        &["po number", "vendor", "total amount"],
        vec![
            vec!["PO9".into(), "A".into(), 1i64.into()],
            vec!["PO1".into(), "A".into(), 1i64.into()],
            vec!["PO5".into(), "A".into(), 1i64.into()],
        ],
    );
    let inv = RawTable::from_rows(
        &["po number", "vendor", "total amount"],
        vec![
            vec!["PO1".into(), "B".into(), 2i64.into()],
            vec!["PO9".into(), "B".into(), 1i64.into()],
        ],
    );

    let result = default_run(&po, &inv);
    let table = result.report.to_table();
    let keys: Vec<(&str, &str)> = table
        .rows
        .iter()
        .map(|r| (r[0].as_str(), r[2].as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("PO9", "vendor"),
            ("PO1", "total amount"),
            ("PO1", "vendor"),
            ("PO5", ""),
        ]
    );
}

// -------------------------------------------------------------------------
// Configuration
// -------------------------------------------------------------------------

#[test]
fn custom_alias_config_from_fixture() {
    let toml = std::fs::read_to_string(fixtures_dir().join("custom-aliases.recon.toml")).unwrap();
    let config = ReconConfig::from_toml(&toml).unwrap();
    let engine = ReconEngine::new(config).unwrap();

    let po = RawTable::from_rows(
        &["Order Ref", "Party", "Net Value", "CCY"],
        vec![
            vec!["4500001".into(), "Acme".into(), 99.99.into(), "EUR".into()],
            vec!["4500002".into(), "Acme".into(), 10i64.into(), "EUR".into()],
        ],
    );
    let inv = RawTable::from_rows(
        &["Document No", "Buyer PO", "Party", "Net Value", "CCY"],
        vec![
            vec!["INV-1".into(), 4500001i64.into(), "ACME GmbH".into(), 100i64.into(), "EUR".into()],
            vec!["INV-2".into(), "4500002".into(), "Acme".into(), 10i64.into(), "USD".into()],
        ],
    );

    let result = engine.run(&po, &inv).unwrap();

    // Vendor is not compared by this config; 99.99 vs 100 is inside tolerance.
    assert_eq!(
        entries(&result),
        vec![DiscrepancyEntry::FieldMismatch {
            po_number: "4500002".into(),
            field: CanonicalField::Currency,
            po_value: Some("EUR".into()),
            invoice_value: Some("USD".into()),
        }]
    );
    assert_eq!(result.meta.config_name, "ERP export vs. supplier invoices");
}

#[test]
fn engines_with_different_alias_tables_coexist() {
    let custom = ReconEngine::new(
        ReconConfig::from_toml(
            &std::fs::read_to_string(fixtures_dir().join("custom-aliases.recon.toml")).unwrap(),
        )
        .unwrap(),
    )
    .unwrap();
    let default = ReconEngine::new(ReconConfig::default()).unwrap();

    let po = RawTable::from_rows(&["order ref"], vec![vec!["X1".into()]]);
    let inv = RawTable::default();

    assert!(custom.run(&po, &inv).unwrap().has_discrepancies());
    // "order ref" means nothing to the default table: no PO number, no entry.
    assert!(!default.run(&po, &inv).unwrap().has_discrepancies());
}

#[test]
fn runs_are_idempotent() {
    let po = RawTable::from_rows(
        &["po number", "vendor"],
        vec![vec!["PO1".into(), "A".into()], vec!["PO2".into(), "B".into()]],
    );
    let inv = RawTable::from_rows(&["po number", "vendor"], vec![vec!["PO1".into(), "C".into()]]);

    let engine = ReconEngine::new(ReconConfig::default()).unwrap();
    let first = engine.run(&po, &inv).unwrap();
    let second = engine.run(&po, &inv).unwrap();
    assert_eq!(first.report, second.report);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn result_serializes_to_json() {
    let po = RawTable::from_rows(&["po number"], vec![vec!["PO2".into()]]);
    let result = default_run(&po, &RawTable::default());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["summary"]["unmatched"], 1);
    assert_eq!(json["report"]["rows"][0]["kind"], "no_matching_invoice");
    assert_eq!(json["report"]["rows"][0]["po_number"], "PO2");
}
