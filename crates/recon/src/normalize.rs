use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::AliasTable;
use crate::model::{
    CanonicalField, HeaderCollision, HeaderResolution, NormalizedRecord, NormalizedTable,
    RawTable,
};

/// Project a raw table onto the canonical schema.
///
/// Unrecognized headers are dropped. When several headers resolve to the same
/// field the right-most column supplies the value; the collision is recorded
/// in the returned [`HeaderResolution`] and logged.
pub fn normalize(table: &RawTable, aliases: &AliasTable) -> NormalizedTable {
    let source = table.source.as_deref().unwrap_or("table");
    let plan: Vec<Option<CanonicalField>> =
        table.headers.iter().map(|h| aliases.resolve(h)).collect();

    let headers = resolve_headers(&table.headers, &plan);
    for collision in &headers.collisions {
        warn!(
            source,
            field = collision.field.key(),
            headers = ?collision.headers,
            "several headers map to one field; the last column wins"
        );
    }
    if !headers.dropped.is_empty() {
        debug!(source, dropped = ?headers.dropped, "unrecognized headers dropped");
    }

    let records = (0..table.rows.len())
        .map(|row| {
            let mut fields = BTreeMap::new();
            for (col, field) in plan.iter().enumerate() {
                if let Some(field) = field {
                    fields.insert(*field, table.cell(row, col).clone());
                }
            }
            NormalizedRecord { row, fields }
        })
        .collect();

    NormalizedTable { records, headers }
}

fn resolve_headers(headers: &[String], plan: &[Option<CanonicalField>]) -> HeaderResolution {
    let mut mapped = Vec::new();
    let mut dropped = Vec::new();
    let mut by_field: BTreeMap<CanonicalField, Vec<String>> = BTreeMap::new();

    for (header, field) in headers.iter().zip(plan) {
        match field {
            Some(field) => {
                mapped.push((header.clone(), *field));
                by_field.entry(*field).or_default().push(header.clone());
            }
            None => dropped.push(header.clone()),
        }
    }

    let collisions = by_field
        .into_iter()
        .filter(|(_, hs)| hs.len() > 1)
        .map(|(field, headers)| HeaderCollision { field, headers })
        .collect();

    HeaderResolution { mapped, dropped, collisions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn table(headers: &[&str], rows: Vec<Vec<CellValue>>) -> RawTable {
        RawTable::from_rows(headers, rows)
    }

    #[test]
    fn maps_aliases_case_insensitively() {
        for header in ["PO Number", "po number", "PO NUMBER", " Po Number "] {
            let raw = table(&[header], vec![vec!["PO1".into()]]);
            let out = normalize(&raw, &AliasTable::default());
            assert_eq!(
                out.records[0].get(CanonicalField::PoNumber),
                Some(&CellValue::from("PO1")),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn unrecognized_headers_are_dropped() {
        let raw = table(
            &["Supplier", "Notes", "Qty"],
            vec![vec!["Acme".into(), "rush".into(), 3i64.into()]],
        );
        let out = normalize(&raw, &AliasTable::default());
        let rec = &out.records[0];
        assert_eq!(rec.fields.len(), 2);
        assert_eq!(rec.get(CanonicalField::Vendor), Some(&CellValue::from("Acme")));
        assert_eq!(rec.get(CanonicalField::Quantity), Some(&CellValue::number(3.0)));
        assert_eq!(out.headers.dropped, vec!["Notes".to_string()]);
        assert!(out.headers.collisions.is_empty());
    }

    #[test]
    fn absent_fields_stay_absent() {
        let raw = table(&["po number"], vec![vec!["PO1".into()]]);
        let out = normalize(&raw, &AliasTable::default());
        assert!(out.records[0].get(CanonicalField::Vendor).is_none());
        assert!(!out.has_field(CanonicalField::Vendor));
        assert!(out.has_field(CanonicalField::PoNumber));
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let raw = table(&["po number", "vendor"], vec![vec!["PO1".into()]]);
        let out = normalize(&raw, &AliasTable::default());
        assert_eq!(out.records[0].get(CanonicalField::Vendor), Some(&CellValue::Empty));
    }

    #[test]
    fn colliding_headers_last_column_wins_and_is_reported() {
        let raw = table(
            &["Amount", "Total", "po number"],
            vec![vec![10i64.into(), 12i64.into(), "PO1".into()]],
        );
        let out = normalize(&raw, &AliasTable::default());
        assert_eq!(
            out.records[0].get(CanonicalField::TotalAmount),
            Some(&CellValue::number(12.0))
        );
        assert_eq!(
            out.headers.collisions,
            vec![HeaderCollision {
                field: CanonicalField::TotalAmount,
                headers: vec!["Amount".into(), "Total".into()],
            }]
        );
    }

    #[test]
    fn row_order_preserved() {
        let raw = table(
            &["po number"],
            vec![vec!["B".into()], vec!["A".into()], vec!["C".into()]],
        );
        let out = normalize(&raw, &AliasTable::default());
        let keys: Vec<_> = out.records.iter().map(|r| r.po_number_key().unwrap()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
        let rows: Vec<_> = out.records.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn empty_table_normalizes_to_empty() {
        let out = normalize(&RawTable::default(), &AliasTable::default());
        assert!(out.is_empty());
        assert_eq!(out.headers, HeaderResolution::default());
    }
}
