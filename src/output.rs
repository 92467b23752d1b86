//! Result types produced by the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A `(date, raw ship text)` pair collected while scanning a sailor block.
///
/// Transient: discarded once the sailor's events are grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub date: NaiveDate,
    pub text: String,
}

impl RawEvent {
    pub fn new(date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            date,
            text: text.into(),
        }
    }
}

/// One sailor block as found in the document, before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSailor {
    pub name: String,
    pub events: Vec<RawEvent>,
}

/// One ship assignment: the first and last certified day aboard.
///
/// `start <= end` always holds; `ship` is normalised and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipAssignment {
    pub ship: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A sailor with their grouped ship assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sailor {
    pub name: String,
    pub assignments: Vec<ShipAssignment>,
}

impl From<RawSailor> for Sailor {
    fn from(raw: RawSailor) -> Self {
        Sailor {
            assignments: crate::pipeline::group::group_by_ship(&raw.events),
            name: raw.name,
        }
    }
}

/// One filled PG-13, ready for the archive.
#[derive(Debug, Clone)]
pub struct RenderedForm {
    /// `<SHIP>.pdf`, sanitised.
    pub file_name: String,
    pub sailor: String,
    pub assignment: ShipAssignment,
    pub bytes: Vec<u8>,
}

/// Counters and timings for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Pages read from the document (after page selection).
    pub pages_scanned: usize,
    /// Sailor blocks detected.
    pub sailors_found: usize,
    /// Sailors that received forms.
    pub sailors_processed: usize,
    /// PG-13 PDFs written to the archive.
    pub forms_rendered: usize,
    pub extract_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The finished archive plus everything needed to report on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Suggested file name for the archive, e.g. `DOE.zip`.
    pub archive_name: String,
    /// ZIP bytes.
    #[serde(skip)]
    pub archive: Vec<u8>,
    /// Sailors detected in the document, in document order. With
    /// [`crate::SailorSelection::First`] only the first one is read.
    pub sailors: Vec<Sailor>,
    /// Archive entry names, in the order they were written.
    pub forms: Vec<String>,
    pub stats: GenerationStats,
}
