//! Sailor-block extraction: a row-scan state machine over laid-out pages.
//!
//! ## States
//!
//! ```text
//!            name row                      signature row
//! Scanning ───────────▶ InsideBlock ─────────────────────▶ Scanning
//!                       │  ▲      │ name row                (sailor flushed)
//!                       │  └──────┘ (previous sailor flushed if it has events)
//!                       │ date row / continuation row
//!                       ▼
//!                    events
//! ```
//!
//! State lives in a small [`ScanState`] threaded through every page, so a
//! block may run across page breaks. Each page is scanned in one of two
//! modes:
//!
//! - **Table**: the page carries a usable grid (some multi-cell row starts
//!   with a date). An event row is a row whose first cell is a date; the ship
//!   text is the next one or two non-empty cells. Rows that were not split
//!   into cells (a single cell, or a first cell that only starts with a date)
//!   are read as free text.
//! - **Free text**: a row whose first token is a date starts an event, and
//!   every following row up to the next date, name or signature row is
//!   appended to it (wrapped vessel names).
//!
//! Events whose ship text contains the skip keyword are dropped whole.

use crate::config::{DateFormat, GeneratorConfig};
use crate::output::{RawEvent, RawSailor};
use crate::pipeline::dates::parse_date;
use crate::pipeline::layout::{PageText, TextRow};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::debug;

/// How the event rows of a page are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    Table,
    FreeText,
}

/// Pick the mode for a page: table when at least one multi-cell row starts
/// with a date cell.
pub fn page_mode(page: &PageText, formats: &[DateFormat]) -> PageMode {
    let has_grid = page.rows.iter().any(|row| {
        row.cells.len() >= 2
            && row
                .cells
                .first()
                .is_some_and(|c| parse_date(c, formats).is_some())
    });
    if has_grid {
        PageMode::Table
    } else {
        PageMode::FreeText
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenSailor {
    name: String,
    events: Vec<RawEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEvent {
    date: NaiveDate,
    text: String,
}

/// Everything the scan remembers between rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    sailor: Option<OpenSailor>,
    pending: Option<PendingEvent>,
}

impl ScanState {
    /// Whether a sailor block is open.
    pub fn in_block(&self) -> bool {
        self.sailor.is_some()
    }
}

/// Row-by-row scanner. Completed sailors queue up until taken.
#[derive(Debug)]
pub struct Scanner<'c> {
    config: &'c GeneratorConfig,
    state: ScanState,
    completed: VecDeque<RawSailor>,
}

impl<'c> Scanner<'c> {
    pub fn new(config: &'c GeneratorConfig) -> Self {
        Self {
            config,
            state: ScanState::default(),
            completed: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Take the oldest completed sailor.
    pub fn pop_completed(&mut self) -> Option<RawSailor> {
        self.completed.pop_front()
    }

    /// Scan every row of a page.
    pub fn scan_page(&mut self, page: &PageText) {
        if page.is_empty() {
            debug!("Empty page; scan state carried over");
            return;
        }
        let mode = page_mode(page, &self.config.date_formats);
        if mode == PageMode::Table {
            self.finalize_pending();
        }
        for row in &page.rows {
            self.scan_row(row, mode);
        }
    }

    /// Scan one row.
    pub fn scan_row(&mut self, row: &TextRow, mode: PageMode) {
        let text = row.text();

        if let Some(name) = self.name_from(&text) {
            self.start_sailor(name);
            return;
        }
        if text.contains(self.config.signature_marker.as_str()) {
            self.end_block();
            return;
        }
        if self.state.sailor.is_none() {
            return;
        }

        match mode {
            PageMode::Table => self.table_row(row),
            PageMode::FreeText => self.free_text_row(&text),
        }
    }

    /// End of input: close any pending event and flush a sailor that has
    /// events even though no signature row was seen.
    pub fn finish(&mut self) {
        self.finalize_pending();
        if let Some(open) = self.state.sailor.take() {
            if open.events.is_empty() {
                debug!("Dropping unterminated block for {} with no events", open.name);
            } else {
                debug!("Flushing unterminated block for {}", open.name);
                self.flush(open);
            }
        }
    }

    fn name_from(&self, text: &str) -> Option<String> {
        let rest = text.trim_start().strip_prefix(self.config.name_prefix.as_str())?;
        let marker = self.config.ssn_marker.as_str();
        let rest = match rest.find(marker) {
            Some(i) if !marker.is_empty() => &rest[..i],
            _ => rest,
        };
        let name = rest.trim();
        if name.is_empty() {
            debug!("Ignoring name row without a name: {:?}", text);
            None
        } else {
            Some(name.to_string())
        }
    }

    fn start_sailor(&mut self, name: String) {
        self.finalize_pending();
        if let Some(prev) = self.state.sailor.take() {
            if prev.events.is_empty() {
                debug!("Discarding block for {} with no events", prev.name);
            } else {
                self.flush(prev);
            }
        }
        debug!("Sailor block opened: {}", name);
        self.state.sailor = Some(OpenSailor {
            name,
            events: Vec::new(),
        });
    }

    fn end_block(&mut self) {
        self.finalize_pending();
        if let Some(open) = self.state.sailor.take() {
            debug!("Sailor block closed: {} ({} events)", open.name, open.events.len());
            self.flush(open);
        }
    }

    fn flush(&mut self, open: OpenSailor) {
        self.completed.push_back(RawSailor {
            name: open.name,
            events: open.events,
        });
    }

    fn table_row(&mut self, row: &TextRow) {
        let Some(first) = row.cells.first() else {
            return;
        };
        let Some(date) = parse_date(first, &self.config.date_formats) else {
            // Date and ship merged into one cell, or a wrapped vessel name.
            if row.cells.len() == 1 || self.leading_date(first).is_some() {
                debug!("Reading unsplit row as free text: {:?}", row.text());
                self.free_text_row(&row.text());
            } else {
                self.finalize_pending();
            }
            return;
        };
        self.finalize_pending();
        let ship = row
            .cells
            .iter()
            .skip(1)
            .take(2)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self.push_event(date, ship);
    }

    /// Date in the first whitespace token of `text`, with the remainder.
    fn leading_date<'t>(&self, text: &'t str) -> Option<(NaiveDate, &'t str)> {
        let trimmed = text.trim();
        let (first, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        parse_date(first, &self.config.date_formats).map(|date| (date, rest.trim()))
    }

    /// Any non-date row is a continuation of the pending event, including
    /// footer lines such as totals that sit before the signature row.
    fn free_text_row(&mut self, text: &str) {
        let trimmed = text.trim();

        if let Some((date, rest)) = self.leading_date(trimmed) {
            self.finalize_pending();
            self.state.pending = Some(PendingEvent {
                date,
                text: rest.to_string(),
            });
        } else if let Some(pending) = self.state.pending.as_mut() {
            if !trimmed.is_empty() {
                if trimmed.contains(':') {
                    debug!(
                        "Continuation row looks like a label, appended to {}: {:?}",
                        pending.date, trimmed
                    );
                }
                if !pending.text.is_empty() {
                    pending.text.push(' ');
                }
                pending.text.push_str(trimmed);
            }
        }
    }

    fn finalize_pending(&mut self) {
        if let Some(pending) = self.state.pending.take() {
            self.push_event(pending.date, pending.text);
        }
    }

    fn push_event(&mut self, date: NaiveDate, ship: String) {
        if ship.trim().is_empty() {
            debug!("Skipping {} row without ship text", date);
            return;
        }
        if self.is_skipped(&ship) {
            debug!("Skipping {} row with skip keyword: {:?}", date, ship);
            return;
        }
        if let Some(open) = self.state.sailor.as_mut() {
            open.events.push(RawEvent::new(date, ship));
        }
    }

    fn is_skipped(&self, ship: &str) -> bool {
        self.config
            .skip_keyword
            .as_deref()
            .is_some_and(|kw| ship.to_uppercase().contains(&kw.to_uppercase()))
    }
}

/// Lazy iterator of sailor blocks in document order.
///
/// Pages are pulled only as needed; once the pages run out the final open
/// block (if it has events) is emitted and the iterator is exhausted.
pub struct SailorBlocks<'c, I> {
    pages: I,
    scanner: Scanner<'c>,
    pages_scanned: usize,
    done: bool,
}

impl<'c, I> SailorBlocks<'c, I> {
    /// Pages consumed so far.
    pub fn pages_scanned(&self) -> usize {
        self.pages_scanned
    }
}

impl<I: Iterator<Item = PageText>> Iterator for SailorBlocks<'_, I> {
    type Item = RawSailor;

    fn next(&mut self) -> Option<RawSailor> {
        loop {
            if let Some(sailor) = self.scanner.pop_completed() {
                return Some(sailor);
            }
            if self.done {
                return None;
            }
            match self.pages.next() {
                Some(page) => {
                    self.pages_scanned += 1;
                    self.scanner.scan_page(&page);
                }
                None => {
                    self.scanner.finish();
                    self.done = true;
                }
            }
        }
    }
}

impl<I: Iterator<Item = PageText>> FusedIterator for SailorBlocks<'_, I> {}

/// Scan `pages` for sailor blocks.
pub fn sailor_blocks<I>(pages: I, config: &GeneratorConfig) -> SailorBlocks<'_, I::IntoIter>
where
    I: IntoIterator<Item = PageText>,
{
    SailorBlocks {
        pages: pages.into_iter(),
        scanner: Scanner::new(config),
        pages_scanned: 0,
        done: false,
    }
}
