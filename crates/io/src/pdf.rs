// PDF import (positioned glyphs -> table) and report export

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use poinv_recon::{CellValue, RawTable, ReportTable};
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::extract::{infer_cell, is_blank_row};

/// Result of pulling positioned text out of a PDF.
#[derive(Debug)]
pub enum PdfContent {
    Lines(Vec<TextLine>),
    /// Page images only, nothing to lay out.
    ScannedImage,
    Error(String),
}

/// A run of glyphs on one line with no column-sized gap inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub x0: f64,
    pub x1: f64,
    pub text: String,
}

/// Segments of one visual line, left to right.
pub type TextLine = Vec<Segment>;

/// Gap between glyphs, in multiples of the font size, that reads as a space.
const WORD_GAP_EM: f64 = 0.15;
/// Gap that starts a new column.
const COLUMN_GAP_EM: f64 = 1.0;
/// Baselines closer than this (in font sizes) share a line.
const LINE_TOLERANCE_EM: f64 = 0.5;

#[derive(Debug, Clone)]
struct Glyph {
    page: u32,
    x: f64,
    end: f64,
    y: f64,
    size: f64,
    text: String,
}

/// Collects every upright glyph with its page-space position. Rotated text
/// (stamps, watermarks) is counted and dropped.
#[derive(Default)]
struct GlyphCollector {
    page: u32,
    glyphs: Vec<Glyph>,
    rotated: usize,
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page = page_num;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        if trm.m12.abs() + trm.m21.abs() > 0.01 * (trm.m11.abs() + trm.m22.abs()) {
            self.rotated += 1;
            return Ok(());
        }
        if char.trim().is_empty() {
            return Ok(());
        }
        let x = trm.m31;
        self.glyphs.push(Glyph {
            page: self.page,
            x,
            end: x + width * font_size * trm.m11.abs(),
            y: trm.m32,
            size: (font_size * trm.m22.abs()).max(f64::EPSILON),
            text: char.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

pub fn extract_lines(pdf_bytes: &[u8]) -> PdfContent {
    let mut doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("failed to parse PDF: {e}")),
    };
    if doc.is_encrypted() {
        if let Err(e) = doc.decrypt("") {
            return PdfContent::Error(format!("encrypted PDF: {e}"));
        }
    }

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return PdfContent::ScannedImage;
    }

    let mut collector = GlyphCollector::default();
    // pdf-extract asserts on some malformed font dictionaries instead of
    // returning an error.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::output_doc(&doc, &mut collector)
    }));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(error = %e, "pdf-extract failed");
            return PdfContent::Error(format!("text extraction failed: {e}"));
        }
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            warn!(reason, "pdf-extract aborted on a malformed document");
            return PdfContent::Error(format!("text extraction failed: {reason}"));
        }
    }

    if collector.rotated > 0 {
        debug!(glyphs = collector.rotated, "rotated text ignored");
    }
    if collector.glyphs.is_empty() {
        return PdfContent::ScannedImage;
    }
    let lines = layout_lines(collector.glyphs);
    debug!(lines = lines.len(), "PDF text laid out");
    PdfContent::Lines(lines)
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("malformed PDF")
}

/// A page with XObject images and no fonts is image-only. When at least 80%
/// of pages are, the document is treated as scanned.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let mut image_only_pages = 0usize;
    for object_id in pages.values() {
        let Ok(page_dict) = doc.get_dictionary(*object_id) else {
            continue;
        };
        if has_resource(doc, page_dict, b"XObject") && !has_resource(doc, page_dict, b"Font") {
            image_only_pages += 1;
        }
    }

    let ratio = image_only_pages as f64 / pages.len() as f64;
    debug!(total_pages = pages.len(), image_only = image_only_pages, "scanned-page analysis");
    ratio >= 0.8
}

fn has_resource(doc: &Document, page_dict: &Dictionary, key: &[u8]) -> bool {
    page_dict
        .get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|x| doc.dereference(x).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}

/// Group glyphs into lines (page order, top to bottom), then cut each line
/// into segments at column-sized gaps.
fn layout_lines(mut glyphs: Vec<Glyph>) -> Vec<TextLine> {
    glyphs.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.total_cmp(&a.y))
            .then(a.x.total_cmp(&b.x))
    });

    let mut lines = Vec::new();
    let mut current: Vec<Glyph> = Vec::new();
    for glyph in glyphs {
        let same_line = current.first().is_some_and(|first| {
            first.page == glyph.page && (first.y - glyph.y).abs() <= first.size * LINE_TOLERANCE_EM
        });
        if !same_line && !current.is_empty() {
            lines.push(segments(std::mem::take(&mut current)));
        }
        current.push(glyph);
    }
    if !current.is_empty() {
        lines.push(segments(current));
    }
    lines
}

fn segments(mut glyphs: Vec<Glyph>) -> TextLine {
    glyphs.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut out: TextLine = Vec::new();
    let mut last_end = f64::NEG_INFINITY;
    for glyph in glyphs {
        let gap = glyph.x - last_end;
        match out.last_mut() {
            Some(seg) if gap <= glyph.size * COLUMN_GAP_EM => {
                if gap > glyph.size * WORD_GAP_EM {
                    seg.text.push(' ');
                }
                seg.text.push_str(&glyph.text);
                seg.x1 = seg.x1.max(glyph.end);
            }
            _ => out.push(Segment { x0: glyph.x, x1: glyph.end, text: glyph.text.clone() }),
        }
        last_end = last_end.max(glyph.end);
    }
    out
}

/// Column of the header segment `seg` overlaps most; with no overlap, the
/// rightmost header starting at or before it.
fn column_for(header: &[Segment], seg: &Segment) -> usize {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| (i, seg.x1.min(h.x1) - seg.x0.max(h.x0)))
        .filter(|(_, overlap)| *overlap > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .or_else(|| header.iter().rposition(|h| h.x0 <= seg.x0))
        .unwrap_or(0)
}

/// Build a table from laid-out lines. The first non-empty line is the header
/// row; later segments land in the header column they sit under, so a blank
/// cell stays blank instead of shifting its neighbours left. Header lines
/// repeated on later pages are skipped.
pub fn lines_to_table(lines: &[TextLine]) -> Option<RawTable> {
    let mut lines = lines.iter().filter(|l| !l.is_empty());
    let header = lines.next()?;
    let mut table = RawTable::new(header.iter().map(|s| s.text.clone()).collect());

    for line in lines {
        let repeats_header =
            line.len() == header.len() && line.iter().zip(header).all(|(a, b)| a.text == b.text);
        if repeats_header {
            continue;
        }

        let mut texts = vec![String::new(); header.len()];
        for seg in line {
            let cell = &mut texts[column_for(header, seg)];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(&seg.text);
        }
        let cells: Vec<CellValue> = texts.iter().map(|t| infer_cell(t)).collect();
        if !is_blank_row(&cells) {
            table.push_row(cells);
        }
    }
    Some(table)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const BODY_FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;
const TOP_Y: i64 = 750;
const BOTTOM_Y: i64 = 40;
const LEFT_X: i64 = 40;

const WATERMARK_FONT_SIZE: f64 = 40.0;
const WATERMARK_ANGLE_DEG: f64 = 30.0;
const WATERMARK_CENTER: (f64, f64) = (300.0, 400.0);
const WATERMARK_ALPHA: f64 = 0.2;

/// Lines that fit on one page between the top and bottom margins.
pub const LINES_PER_PAGE: usize = ((TOP_Y - BOTTOM_Y) / LEADING + 1) as usize;

fn real(v: f64) -> Object {
    Object::Real(v as _)
}

fn pdf_text(s: &str) -> Object {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(s);
    Object::String(bytes.into_owned(), StringFormat::Literal)
}

/// One report line per row: the header, then each data row, cells joined
/// with `" | "`.
pub fn table_lines(table: &ReportTable) -> Vec<String> {
    std::iter::once(table.columns.join(" | "))
        .chain(table.rows.iter().map(|r| r.join(" | ")))
        .collect()
}

fn page_operations(lines: &[String], watermark: &str) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(BODY_FONT_SIZE)]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new("Td", vec![Object::Integer(LEFT_X), Object::Integer(TOP_Y)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("Tj", vec![pdf_text(line)]));
    }
    ops.push(Operation::new("ET", vec![]));

    if !watermark.is_empty() {
        // Helvetica averages about half an em per glyph.
        let half_width = watermark.chars().count() as f64 * WATERMARK_FONT_SIZE * 0.5 / 2.0;
        let (sin, cos) = WATERMARK_ANGLE_DEG.to_radians().sin_cos();
        let x = WATERMARK_CENTER.0 - half_width * cos;
        let y = WATERMARK_CENTER.1 - half_width * sin;
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec!["GS1".into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), real(WATERMARK_FONT_SIZE)]),
            Operation::new(
                "Tm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(x), real(y)],
            ),
            Operation::new("Tj", vec![pdf_text(watermark)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }
    ops
}

/// Write the report as a paginated PDF with a translucent rotated watermark
/// on every page.
pub fn write_pdf(table: &ReportTable, path: &Path, watermark: &str) -> Result<usize, RenderError> {
    let lines = table_lines(table);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => real(WATERMARK_ALPHA),
        "CA" => real(WATERMARK_ALPHA),
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "ExtGState" => dictionary! { "GS1" => gs_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(LINES_PER_PAGE) {
        let content = Content { operations: page_operations(chunk, watermark) };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Pdf(format!("failed to encode page: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Integer(PAGE_WIDTH), Object::Integer(PAGE_HEIGHT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path).map_err(|e| RenderError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!(path = %path.display(), pages = page_count, lines = lines.len(), "PDF report written");
    Ok(page_count)
}

/// Standard Helvetica with WinAnsi encoding.
#[cfg(test)]
pub(crate) fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// One-page PDF laying `rows` out as a table: each cell is its own text
/// object, columns 150pt apart, the way invoicing software draws them.
#[cfg(test)]
pub(crate) fn column_pdf(font: Dictionary, rows: &[&[&str]]) -> Vec<u8> {
    let mut ops = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let y = TOP_Y - r as i64 * LEADING * 2;
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let x = 50 + c as i64 * 150;
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(BODY_FONT_SIZE)]),
                Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
                Operation::new("Tj", vec![pdf_text(cell)]),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font);
    let content = Content { operations: ops }.encode().unwrap();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), Object::Integer(PAGE_WIDTH), Object::Integer(PAGE_HEIGHT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
