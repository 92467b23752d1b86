//! ZIP assembly: rendered forms → one deflated archive.
//!
//! Entry and archive names depend on the sailor selection:
//!
//! | selection | entries                 | archive                          |
//! |-----------|-------------------------|----------------------------------|
//! | `First`   | `<SHIP>.pdf`            | `<SURNAME>.zip`                  |
//! | `All`     | `<SURNAME>/<SHIP>.pdf`  | `<SURNAME>.zip` for one sailor, `PG13.zip` otherwise |

use crate::config::SailorSelection;
use crate::error::Pg13Error;
use crate::output::RenderedForm;
use crate::pipeline::render::sanitize_component;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive name used when forms for several sailors are bundled.
pub const MULTI_SAILOR_ARCHIVE: &str = "PG13.zip";

/// A named file inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Surname for archive naming: the text before the first comma when there
/// is one, else the last whitespace token.
pub fn surname(name: &str) -> String {
    let raw = match name.split_once(',') {
        Some((last, _)) => last.trim(),
        None => name.split_whitespace().last().unwrap_or(""),
    };
    sanitize_component(&raw.to_uppercase(), "SAILOR")
}

/// Name the archive and its entries for `forms`.
///
/// Entry names are made unique by suffixing ` (2)`, ` (3)`, … before the
/// extension.
pub fn plan_entries(
    forms: &[RenderedForm],
    selection: SailorSelection,
) -> (String, Vec<ArchiveEntry>) {
    let sailors: Vec<&str> = {
        let mut seen = HashSet::new();
        forms
            .iter()
            .map(|f| f.sailor.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    };
    let nested = selection == SailorSelection::All;
    let archive_name = match sailors.as_slice() {
        [only] => format!("{}.zip", surname(only)),
        [] => MULTI_SAILOR_ARCHIVE.to_string(),
        _ if !nested => format!("{}.zip", surname(sailors[0])),
        _ => MULTI_SAILOR_ARCHIVE.to_string(),
    };

    let mut used = HashSet::new();
    let entries = forms
        .iter()
        .map(|form| {
            let wanted = if nested {
                format!("{}/{}", surname(&form.sailor), form.file_name)
            } else {
                form.file_name.clone()
            };
            ArchiveEntry {
                name: unique_name(&wanted, &mut used),
                bytes: form.bytes.clone(),
            }
        })
        .collect();
    (archive_name, entries)
}

fn unique_name(wanted: &str, used: &mut HashSet<String>) -> String {
    if used.insert(wanted.to_string()) {
        return wanted.to_string();
    }
    let (stem, ext) = match wanted.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (wanted, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            debug!("Archive entry {:?} renamed to {:?}", wanted, candidate);
            return candidate;
        }
        n += 1;
    }
}

/// Write `entries` into an in-memory deflated ZIP.
pub fn build_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, Pg13Error> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        zip.write_all(&entry.bytes)
            .map_err(|e| Pg13Error::ArchiveFailed(format!("{}: {}", entry.name, e)))?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ShipAssignment;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    fn form(sailor: &str, ship: &str) -> RenderedForm {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        RenderedForm {
            file_name: format!("{ship}.pdf"),
            sailor: sailor.into(),
            assignment: ShipAssignment {
                ship: ship.into(),
                start: day,
                end: day,
            },
            bytes: format!("%PDF {ship}").into_bytes(),
        }
    }

    #[test]
    fn surname_rules() {
        assert_eq!(surname("Doe, John A"), "DOE");
        assert_eq!(surname("BRANDON ANDERSEN"), "ANDERSEN");
        assert_eq!(surname("  "), "SAILOR");
        assert_eq!(surname("O/BRIEN, PAT"), "O_BRIEN");
    }

    #[test]
    fn first_selection_uses_flat_entries() {
        let forms = vec![form("DOE, JOHN", "USS COLE"), form("DOE, JOHN", "LAKE ERIE")];
        let (name, entries) = plan_entries(&forms, SailorSelection::First);
        assert_eq!(name, "DOE.zip");
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["USS COLE.pdf", "LAKE ERIE.pdf"]);
    }

    #[test]
    fn all_selection_nests_by_surname() {
        let forms = vec![form("DOE, JOHN", "USS COLE"), form("ROE, JANE", "USS COLE")];
        let (name, entries) = plan_entries(&forms, SailorSelection::All);
        assert_eq!(name, "PG13.zip");
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["DOE/USS COLE.pdf", "ROE/USS COLE.pdf"]);

        let (single, _) = plan_entries(&forms[..1], SailorSelection::All);
        assert_eq!(single, "DOE.zip");
    }

    #[test]
    fn colliding_entries_are_numbered() {
        let forms = vec![form("DOE, JOHN", "USS COLE"), form("DOE, JANE", "USS COLE")];
        let (_, entries) = plan_entries(&forms, SailorSelection::All);
        assert_eq!(entries[0].name, "DOE/USS COLE.pdf");
        assert_eq!(entries[1].name, "DOE/USS COLE (2).pdf");
    }

    #[test]
    fn archive_reads_back() {
        let entries = vec![
            ArchiveEntry {
                name: "USS COLE.pdf".into(),
                bytes: b"one".to_vec(),
            },
            ArchiveEntry {
                name: "LAKE ERIE.pdf".into(),
                bytes: b"two".to_vec(),
            },
        ];
        let bytes = build_archive(&entries).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut file = zip.by_name("LAKE ERIE.pdf").unwrap();
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "two");
    }

    #[test]
    fn empty_archive_is_still_valid() {
        let bytes = build_archive(&[]).unwrap();
        assert_eq!(ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 0);
    }
}
