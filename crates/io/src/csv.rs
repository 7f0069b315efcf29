// CSV/TSV import

use poinv_recon::RawTable;

use crate::extract::{infer_cell, is_blank_row};

/// Decode file bytes as UTF-8, falling back to Windows-1252 (common for
/// Excel-exported CSVs). A leading BOM is dropped.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Delimiters tried when sniffing, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter that splits the header into several columns with the
/// most sampled rows agreeing on that width; wider headers break ties, then
/// list order. Falls back to comma when nothing splits the header.
pub fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .iter()
        .rev()
        .filter_map(|&delimiter| {
            let widths = record_widths(content, delimiter);
            let (&header, rows) = widths.split_first()?;
            let agreeing = rows.iter().filter(|&&w| w == header).count();
            (header > 1).then_some((delimiter, (agreeing, header)))
        })
        .max_by_key(|&(_, score)| score)
        .map_or(b',', |(delimiter, _)| delimiter)
}

/// Field counts of the first non-blank records under `delimiter`. Quoted
/// fields spanning lines count once.
fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .map_while(Result::ok)
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .take(SNIFF_RECORDS)
        .map(|r| r.len())
        .collect()
}

/// Parse delimited text into a raw table. The first non-blank record is the
/// header row; blank records are skipped.
pub fn parse_table(content: &str, delimiter: u8) -> Result<Option<RawTable>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut table: Option<RawTable> = None;

    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("line {}: {e}", idx + 1))?;
        match table.as_mut() {
            None => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                table = Some(RawTable::new(record.iter().map(|h| h.to_string()).collect()));
            }
            Some(t) => {
                let cells: Vec<_> = record.iter().map(infer_cell).collect();
                if !is_blank_row(&cells) {
                    t.push_row(cells);
                }
            }
        }
    }

    Ok(table)
}
