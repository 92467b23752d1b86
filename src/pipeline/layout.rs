//! Page layout: turn each PDF page into rows of text cells.
//!
//! The extractor needs two views of a page: its text lines in reading order,
//! and a best-effort table grid. Both come from the same place. Every text
//! run the content stream draws is positioned by replaying the text and
//! graphics state operators; runs on the same baseline form a row, and a wide
//! horizontal gap between two runs starts a new cell. A row with one cell is
//! a plain line, a row with several is a table row.
//!
//! Glyph widths are not read from the font programs. Advances are estimated
//! at half an em per character, which is close enough to tell the gap between
//! two words from the gap between two table columns on the certification
//! sheet.
//!
//! Strings decode as UTF-16BE when they start with a BOM and as Windows-1252
//! otherwise. The sheet's Wingdings checkbox byte (`0xFE`) therefore arrives
//! as `þ`, which [`crate::pipeline::normalize`] knows to strip.

use crate::config::GeneratorConfig;
use crate::error::Pg13Error;
use encoding_rs::{UTF_16BE, WINDOWS_1252};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};

/// Estimated glyph advance in em.
const AVG_GLYPH_WIDTH_EM: f32 = 0.5;

/// Gaps narrower than this (in em) join two runs without a space.
const WORD_GAP_EM: f32 = 0.15;

/// One visual row of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    pub cells: Vec<String>,
}

impl TextRow {
    /// A row holding a single line of text.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            cells: vec![text.into()],
        }
    }

    /// A table row.
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    /// The row as a single line: non-empty cells joined by one space.
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The rows of one page, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub rows: Vec<TextRow>,
}

impl PageText {
    /// Build a page from plain text, one row per non-blank line.
    ///
    /// Tabs and runs of three or more spaces separate cells, which is how
    /// layout-preserving text dumps render table columns.
    pub fn from_text(text: &str) -> Self {
        let rows = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| TextRow::from_cells(split_text_cells(l)))
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn split_text_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    for chunk in line.split('\t') {
        let mut current = String::new();
        let mut spaces = 0usize;
        for ch in chunk.chars() {
            if ch == ' ' {
                spaces += 1;
                continue;
            }
            if spaces >= 3 && !current.is_empty() {
                cells.push(std::mem::take(&mut current));
            } else if spaces > 0 && !current.is_empty() {
                current.push(' ');
            }
            spaces = 0;
            current.push(ch);
        }
        if !current.is_empty() {
            cells.push(current);
        }
    }
    cells
}

// ── Document loading ─────────────────────────────────────────────────────

/// Load a PDF, mapping parse failures to [`Pg13Error::CorruptPdf`].
pub fn load_document(path: &Path) -> Result<Document, Pg13Error> {
    Document::load(path).map_err(|e| Pg13Error::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Lazily lay out the selected pages (0-indexed) of `doc`.
///
/// A page whose content cannot be decoded yields an empty [`PageText`] so the
/// scan carries on with the next page.
pub fn pdf_pages<'a>(
    doc: &'a Document,
    indices: Vec<usize>,
    config: &'a GeneratorConfig,
) -> impl Iterator<Item = PageText> + 'a {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    indices.into_iter().filter_map(move |idx| {
        let Some(&page_id) = page_ids.get(idx) else {
            warn!("Skipping page {} (out of range, total={})", idx + 1, page_ids.len());
            return None;
        };
        match page_layout(doc, page_id, config) {
            Ok(page) => {
                debug!("Page {} → {} rows", idx + 1, page.rows.len());
                Some(page)
            }
            Err(e) => {
                warn!("Page {} has no readable text: {}", idx + 1, e);
                Some(PageText::default())
            }
        }
    })
}

/// Split a text dump into pages on form feeds and keep the selected ones.
pub fn text_pages(text: &str, indices: &[usize]) -> Vec<PageText> {
    let pages: Vec<&str> = text.split('\u{c}').collect();
    indices
        .iter()
        .filter_map(|&i| pages.get(i))
        .map(|p| PageText::from_text(p))
        .collect()
}

/// Number of pages in a text dump.
pub fn text_page_count(text: &str) -> usize {
    text.split('\u{c}').count()
}

/// Lay out a single page.
pub fn page_layout(
    doc: &Document,
    page_id: ObjectId,
    config: &GeneratorConfig,
) -> Result<PageText, lopdf::Error> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut interp = Interpreter::default();
    for op in &content.operations {
        interp.apply(&op.operator, &op.operands);
    }

    Ok(assemble_rows(interp.runs, config.row_tolerance, config.column_gap_em))
}

// ── Content-stream interpretation ────────────────────────────────────────

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut m = [0.0f32; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(self, other: Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn origin(&self) -> (f32, f32) {
        (self.0[4], self.0[5])
    }

    fn vertical_scale(&self) -> f32 {
        (self.0[2] * self.0[2] + self.0[3] * self.0[3]).sqrt()
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// A positioned piece of text in user space.
#[derive(Debug, Clone, PartialEq)]
struct TextRun {
    x: f32,
    y: f32,
    end_x: f32,
    size: f32,
    text: String,
}

#[derive(Debug)]
struct Interpreter {
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_size: f32,
    leading: f32,
    runs: Vec<TextRun>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            runs: Vec::new(),
        }
    }
}

impl Interpreter {
    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(m) = self.saved.pop() {
                    self.ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.ctm = m.then(self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(number) {
                    self.leading = l;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    if operator == "TD" {
                        self.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adj) = number(other) {
                                    self.advance(-adj / 1000.0 * self.font_size);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).then(self.tm);
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = decode_pdf_string(bytes);
        let glyphs = text.chars().count() as f32;

        let start = self.tm.then(self.ctm);
        self.advance(glyphs * AVG_GLYPH_WIDTH_EM * self.font_size);
        let end = self.tm.then(self.ctm);

        if text.trim().is_empty() {
            return;
        }
        let (x, y) = start.origin();
        let scale = start.vertical_scale();
        self.runs.push(TextRun {
            x,
            y,
            end_x: end.origin().0,
            size: if scale > 0.0 {
                self.font_size * scale
            } else {
                self.font_size
            },
            text,
        });
    }
}

/// Decode a PDF string operand.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        UTF_16BE.decode_without_bom_handling(rest).0.into_owned()
    } else {
        WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
    }
}

// ── Row and cell assembly ────────────────────────────────────────────────

fn assemble_rows(mut runs: Vec<TextRun>, row_tolerance: f32, column_gap_em: f32) -> PageText {
    // Top of the page first, then left to right.
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut grouped: Vec<(f32, Vec<TextRun>)> = Vec::new();
    for run in runs {
        let same_row = grouped
            .last()
            .is_some_and(|(baseline, _)| (*baseline - run.y).abs() <= row_tolerance);
        match grouped.last_mut() {
            Some((_, members)) if same_row => members.push(run),
            _ => grouped.push((run.y, vec![run])),
        }
    }

    let rows = grouped
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            TextRow {
                cells: split_cells(&members, column_gap_em),
            }
        })
        .collect();

    PageText { rows }
}

fn split_cells(runs: &[TextRun], column_gap_em: f32) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut prev_end: Option<f32> = None;

    for run in runs {
        let gap = prev_end.map(|end| run.x - end);
        let joins = gap.is_some_and(|g| g <= column_gap_em * run.size);
        match cells.last_mut() {
            Some(cell) if joins => {
                if gap.unwrap_or(0.0) > WORD_GAP_EM * run.size && !cell.ends_with(' ') {
                    cell.push(' ');
                }
                cell.push_str(&run.text);
            }
            _ => cells.push(run.text.clone()),
        }
        prev_end = Some(prev_end.map_or(run.end_x, |e| e.max(run.end_x)));
    }

    cells.into_iter().map(|c| c.trim().to_string()).collect()
}
