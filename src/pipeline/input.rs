//! Input resolution: validate the sheet path and decide how to read it.
//!
//! The sheet is accepted by extension alone: `.pdf` is parsed with lopdf and
//! `.txt` is treated as a layout-preserving text dump (one form feed between
//! pages). Uploaded bytes are staged into a `TempDir` so both cases read from
//! a real path; the directory is removed when the `ResolvedInput` drops.

use crate::error::Pg13Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// How the sheet's content is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Text,
}

/// The resolved input: a readable local file of a known kind.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: InputKind },
    /// Input arrived as bytes and was written to a temp directory.
    /// The `TempDir` is kept alive until processing completes.
    Staged {
        path: PathBuf,
        kind: InputKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Staged { path, .. } => path,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Local { kind, .. } | ResolvedInput::Staged { kind, .. } => *kind,
        }
    }
}

/// Classify `path` by its extension (case-insensitive).
pub fn input_kind(path: &Path) -> Result<InputKind, Pg13Error> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => Ok(InputKind::Pdf),
        Some("txt") => Ok(InputKind::Text),
        _ => Err(Pg13Error::UnsupportedInput {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Resolve a local path, checking its extension, existence and read
/// permission.
pub fn resolve_input(path: &Path) -> Result<ResolvedInput, Pg13Error> {
    let kind = input_kind(path)?;
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(Pg13Error::FileNotFound { path });
    }

    if let Err(e) = std::fs::File::open(&path) {
        return Err(read_error(&path, e));
    }

    debug!("Resolved local sheet ({:?}): {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

/// Map an I/O failure while reading the sheet to an input error.
pub fn read_error(path: &Path, e: std::io::Error) -> Pg13Error {
    let path = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => Pg13Error::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => Pg13Error::PermissionDenied { path },
        _ => Pg13Error::InputUnreadable { path, source: e },
    }
}

/// Write uploaded bytes to a temporary file named after `file_name`.
///
/// Only the final path component of `file_name` is used.
pub fn stage_upload(bytes: &[u8], file_name: &str) -> Result<ResolvedInput, Pg13Error> {
    let name = Path::new(file_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(file_name));
    let kind = input_kind(&name)?;

    let temp_dir = TempDir::new().map_err(|e| Pg13Error::Internal(e.to_string()))?;
    let path = temp_dir.path().join(&name);
    std::fs::write(&path, bytes)
        .map_err(|e| Pg13Error::Internal(format!("Failed to stage upload: {}", e)))?;

    debug!("Staged {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Staged {
        path,
        kind,
        _temp_dir: temp_dir,
    })
}
