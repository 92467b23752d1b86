//! Configuration types for certification-sheet processing.
//!
//! Every knob lives in [`GeneratorConfig`], built via its
//! [`GeneratorConfigBuilder`]. The certification sheet is a fixed template,
//! so the defaults match it exactly; the markers are still overridable for
//! the day the template's wording changes.

use crate::error::Pg13Error;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix of the line that opens a sailor block.
pub const DEFAULT_NAME_PREFIX: &str = "Name:";

/// Marker after which the name line carries the SSN.
pub const DEFAULT_SSN_MARKER: &str = "SSN";

/// Substring of the line that closes a sailor block.
pub const DEFAULT_SIGNATURE_MARKER: &str = "SIGNATURE OF CERTIFYING OFFICER";

/// Rows mentioning this keyword (ASW MITE entries) are dropped.
pub const DEFAULT_SKIP_KEYWORD: &str = "MITE";

/// Configuration for extracting sailors and rendering PG-13 forms.
///
/// Built via [`GeneratorConfig::builder()`] or using
/// [`GeneratorConfig::default()`].
///
/// # Example
/// ```rust
/// use seaduty_pg13::{GeneratorConfig, SailorSelection};
///
/// let config = GeneratorConfig::builder()
///     .skip_keyword("MITE")
///     .selection(SailorSelection::First)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Line prefix that starts a sailor block. Default: `"Name:"`.
    pub name_prefix: String,

    /// Marker on the name line before which the name is cut. Default: `"SSN"`.
    pub ssn_marker: String,

    /// Substring that terminates a sailor block.
    /// Default: `"SIGNATURE OF CERTIFYING OFFICER"`.
    pub signature_marker: String,

    /// Case-insensitive keyword that excludes a whole event row.
    /// Default: `Some("MITE")`. `None` keeps every row.
    pub skip_keyword: Option<String>,

    /// Date formats accepted in the first cell / first token of an event row.
    /// Tried in order. Default: `M/D/YYYY`, then `M/D/YY`.
    pub date_formats: Vec<DateFormat>,

    /// Pages of the sheet to scan. Default: all.
    pub pages: PageSelection,

    /// Which detected sailors get forms. Default: [`SailorSelection::All`].
    pub selection: SailorSelection,

    /// PG-13 template with AcroForm fields. When `None` a plain certificate
    /// page is drawn instead.
    pub template_path: Option<PathBuf>,

    /// AcroForm field names written in the template.
    pub fields: FormFields,

    /// Maximum baseline difference, in points, for two text runs to share a
    /// row. Default: 2.0.
    pub row_tolerance: f32,

    /// Horizontal gap, in multiples of the font size, that separates two
    /// table cells on the same row. Default: 1.5.
    pub column_gap_em: f32,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            ssn_marker: DEFAULT_SSN_MARKER.to_string(),
            signature_marker: DEFAULT_SIGNATURE_MARKER.to_string(),
            skip_keyword: Some(DEFAULT_SKIP_KEYWORD.to_string()),
            date_formats: vec![DateFormat::MonthDayYear, DateFormat::MonthDayShortYear],
            pages: PageSelection::default(),
            selection: SailorSelection::default(),
            template_path: None,
            fields: FormFields::default(),
            row_tolerance: 2.0,
            column_gap_em: 1.5,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("name_prefix", &self.name_prefix)
            .field("ssn_marker", &self.ssn_marker)
            .field("signature_marker", &self.signature_marker)
            .field("skip_keyword", &self.skip_keyword)
            .field("date_formats", &self.date_formats)
            .field("pages", &self.pages)
            .field("selection", &self.selection)
            .field("template_path", &self.template_path)
            .field("fields", &self.fields)
            .field("row_tolerance", &self.row_tolerance)
            .field("column_gap_em", &self.column_gap_em)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.name_prefix = prefix.into();
        self
    }

    pub fn ssn_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.ssn_marker = marker.into();
        self
    }

    pub fn signature_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.signature_marker = marker.into();
        self
    }

    pub fn skip_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.config.skip_keyword = if keyword.trim().is_empty() {
            None
        } else {
            Some(keyword)
        };
        self
    }

    pub fn no_skip_keyword(mut self) -> Self {
        self.config.skip_keyword = None;
        self
    }

    pub fn date_formats(mut self, formats: Vec<DateFormat>) -> Self {
        self.config.date_formats = formats;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn selection(mut self, selection: SailorSelection) -> Self {
        self.config.selection = selection;
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = Some(path.into());
        self
    }

    pub fn fields(mut self, fields: FormFields) -> Self {
        self.config.fields = fields;
        self
    }

    pub fn row_tolerance(mut self, points: f32) -> Self {
        self.config.row_tolerance = points;
        self
    }

    pub fn column_gap_em(mut self, em: f32) -> Self {
        self.config.column_gap_em = em;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, Pg13Error> {
        let c = &self.config;
        if c.name_prefix.trim().is_empty() {
            return Err(Pg13Error::InvalidConfig(
                "Name prefix must not be empty".into(),
            ));
        }
        if c.signature_marker.trim().is_empty() {
            return Err(Pg13Error::InvalidConfig(
                "Signature marker must not be empty".into(),
            ));
        }
        if c.date_formats.is_empty() {
            return Err(Pg13Error::InvalidConfig(
                "At least one date format is required".into(),
            ));
        }
        if !(c.row_tolerance > 0.0) {
            return Err(Pg13Error::InvalidConfig(format!(
                "Row tolerance must be > 0, got {}",
                c.row_tolerance
            )));
        }
        if !(c.column_gap_em > 0.0) {
            return Err(Pg13Error::InvalidConfig(format!(
                "Column gap must be > 0, got {}",
                c.column_gap_em
            )));
        }
        c.fields.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// A date layout accepted on the certification sheet.
///
/// Month and day may be written with one or two digits in both layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// `M/D/YYYY`, e.g. `3/4/2024`.
    MonthDayYear,
    /// `M/D/YY`, e.g. `3/4/24`. Years 00–68 map to 20xx, 69–99 to 19xx.
    MonthDayShortYear,
}

/// Which detected sailors receive PG-13 forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SailorSelection {
    /// Every sailor with at least one assignment (default).
    #[default]
    All,
    /// Only the first sailor in the document; later blocks are ignored.
    First,
}

/// Specifies which pages of the sheet to scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Scan all pages (default).
    #[default]
    All,
    /// Scan a single page (1-indexed).
    Single(usize),
    /// Scan a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Scan specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// AcroForm field names of the PG-13 (NAVPERS 1070/613) template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    /// Sailor name, `LAST, FIRST MIDDLE`. Default: `"NAME"`.
    pub name: String,
    /// First remarks line, "REPORT CAREER SEA PAY FROM … TO …". Default: `"Date"`.
    pub date: String,
    /// Vessel name in the certification sentence. Default: `"SHIP"`.
    pub ship: String,
    /// Subject line, "MM/DD/YY TO MM/DD/YY". Default: `"Subject"`.
    pub subject: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            name: "NAME".into(),
            date: "Date".into(),
            ship: "SHIP".into(),
            subject: "Subject".into(),
        }
    }
}

impl FormFields {
    fn validate(&self) -> Result<(), Pg13Error> {
        for (label, value) in [
            ("name", &self.name),
            ("date", &self.date),
            ("ship", &self.ship),
            ("subject", &self.subject),
        ] {
            if value.trim().is_empty() {
                return Err(Pg13Error::InvalidConfig(format!(
                    "Form field name for '{label}' must not be empty"
                )));
            }
        }
        Ok(())
    }
}
