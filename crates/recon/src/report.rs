use crate::model::{
    DiscrepancyEntry, DiscrepancyReport, ReportRow, ReportTable, FIELD_MISMATCH,
    NO_DISCREPANCIES_MESSAGE, NO_MATCHING_INVOICE,
};

pub const DISCREPANCY_COLUMNS: [&str; 5] =
    ["PO Number", "Issue", "Field", "PO Value", "Invoice Value"];

pub const MESSAGE_COLUMNS: [&str; 1] = ["Message"];

/// Build the engine's output. Entries keep their order; an empty input
/// becomes the single "no discrepancies" row.
pub fn assemble(entries: Vec<DiscrepancyEntry>) -> DiscrepancyReport {
    let rows = if entries.is_empty() {
        vec![ReportRow::Message {
            message: NO_DISCREPANCIES_MESSAGE.to_string(),
        }]
    } else {
        entries.into_iter().map(ReportRow::Discrepancy).collect()
    };
    DiscrepancyReport { rows }
}

impl DiscrepancyReport {
    /// Flatten into the string table consumed by report rendering.
    /// Missing values render as empty strings.
    pub fn to_table(&self) -> ReportTable {
        if self.is_clean() {
            return ReportTable {
                columns: MESSAGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                rows: self
                    .rows
                    .iter()
                    .filter_map(|r| match r {
                        ReportRow::Message { message } => Some(vec![message.clone()]),
                        ReportRow::Discrepancy(_) => None,
                    })
                    .collect(),
            };
        }

        let rows = self
            .entries()
            .map(|entry| match entry {
                DiscrepancyEntry::NoMatchingInvoice { po_number } => vec![
                    po_number.clone(),
                    NO_MATCHING_INVOICE.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ],
                DiscrepancyEntry::FieldMismatch {
                    po_number,
                    field,
                    po_value,
                    invoice_value,
                } => vec![
                    po_number.clone(),
                    FIELD_MISMATCH.to_string(),
                    field.name().to_string(),
                    po_value.as_ref().map(|v| v.display()).unwrap_or_default(),
                    invoice_value.as_ref().map(|v| v.display()).unwrap_or_default(),
                ],
            })
            .collect();

        ReportTable {
            columns: DISCREPANCY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}
