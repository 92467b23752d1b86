//! Error types for the seaduty-pg13 library.
//!
//! Every failure here is **fatal** for the run: the certification sheet
//! cannot be read, holds no sailors, or the forms cannot be written. Nothing
//! is retried and no partial archive is produced.
//!
//! Row-level problems are deliberately *not* errors. An unparseable date or a
//! ship cell that normalises to nothing simply means "this row is not an
//! event"; the extractor skips it and logs at `debug` level.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the seaduty-pg13 library.
#[derive(Debug, Error)]
pub enum Pg13Error {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Certification sheet not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file name does not carry an accepted extension.
    #[error("Unsupported input '{path}': expected a .pdf (or .txt text dump), got {extension:?}")]
    UnsupportedInput {
        path: PathBuf,
        extension: Option<String>,
    },

    /// The file exists but reading it failed.
    #[error("Could not read '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The PDF structure could not be parsed.
    #[error("PDF '{path}' is unreadable: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Content errors ────────────────────────────────────────────────────
    /// The document was readable but no sailor block was detected.
    #[error("No valid sailors/events found in '{path}'. Check the PDF format.")]
    NoSailorsFound { path: PathBuf },

    /// A sailor was selected for rendering but has no ship assignments.
    #[error("Sailor '{name}' has no ship assignments to certify. Check the PDF format.")]
    NoAssignments { name: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The PG-13 template could not be loaded.
    #[error("PG-13 template '{path}' is unreadable: {detail}")]
    TemplateUnreadable { path: PathBuf, detail: String },

    /// lopdf failed while filling or serialising a form.
    #[error("Failed to render PG-13 for {ship}: {detail}")]
    RenderFailed { ship: String, detail: String },

    /// The ZIP archive could not be assembled.
    #[error("Failed to build archive: {0}")]
    ArchiveFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output archive.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for Pg13Error {
    fn from(e: zip::result::ZipError) -> Self {
        Pg13Error::ArchiveFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sailors_display_asks_to_check_format() {
        let e = Pg13Error::NoSailorsFound {
            path: PathBuf::from("sheet.pdf"),
        };
        let msg = e.to_string();
        assert!(msg.contains("sheet.pdf"), "got: {msg}");
        assert!(msg.contains("Check the PDF format"), "got: {msg}");
    }

    #[test]
    fn unsupported_input_display() {
        let e = Pg13Error::UnsupportedInput {
            path: PathBuf::from("sheet.docx"),
            extension: Some("docx".into()),
        };
        assert!(e.to_string().contains("docx"));
    }

    #[test]
    fn render_failed_display() {
        let e = Pg13Error::RenderFailed {
            ship: "USS COLE".into(),
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("USS COLE"));
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn input_unreadable_keeps_io_source() {
        use std::error::Error as _;
        let e = Pg13Error::InputUnreadable {
            path: PathBuf::from("dump.txt"),
            source: std::io::Error::other("disk gone"),
        };
        assert!(e.to_string().contains("dump.txt"));
        assert!(e.source().is_some());
    }

    #[test]
    fn zip_error_converts_to_archive_failed() {
        let e: Pg13Error = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(e, Pg13Error::ArchiveFailed(_)));
    }
}
