//! Generation entry points: certification sheet → sailors → PG-13 archive.
//!
//! The core is synchronous: reading a sheet and filling a handful of forms is
//! CPU-bound and short. The async entry points move the whole job onto one
//! `spawn_blocking` task so callers on a Tokio runtime never stall a worker.

use crate::config::{GeneratorConfig, SailorSelection};
use crate::error::Pg13Error;
use crate::output::{GenerationOutput, GenerationStats, RenderedForm, Sailor};
use crate::pipeline::extract::sailor_blocks;
use crate::pipeline::input::{self, InputKind, ResolvedInput};
use crate::pipeline::layout::{self, PageText};
use crate::pipeline::render::{self, FormSource, FormValues};
use crate::pipeline::archive;
use encoding_rs::WINDOWS_1252;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Read a certification sheet and return the sailors it lists, with
/// assignments grouped by ship.
///
/// Honours `config.selection` the same way generation does: with
/// [`SailorSelection::First`] only the first sailor block is read. Sailors
/// whose block closed without any event are included with an empty
/// assignment list.
pub fn extract_sailors(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<Vec<Sailor>, Pg13Error> {
    let resolved = input::resolve_input(path.as_ref())?;
    Ok(extract(&resolved, config, selection_limit(config.selection))?.sailors)
}

/// Async wrapper around [`extract_sailors`].
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<Vec<Sailor>, Pg13Error> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_sailors(&path, &config))
        .await
        .map_err(|e| Pg13Error::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Generate the PG-13 archive for a certification sheet.
///
/// # Errors
/// Every error is fatal and no partial archive is returned:
/// - the file is missing, unreadable or not `.pdf`/`.txt`
/// - the PDF cannot be parsed
/// - no sailor block was found, or the selected sailors have no assignments
/// - a form or the archive could not be written
pub fn generate_sync(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Pg13Error> {
    let path = path.as_ref();
    info!("Starting generation: {}", path.display());
    let resolved = input::resolve_input(path)?;
    run(&resolved, path, config)
}

/// Async wrapper around [`generate_sync`].
pub async fn generate(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Pg13Error> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || generate_sync(&path, &config))
        .await
        .map_err(|e| Pg13Error::Internal(format!("Generation task panicked: {}", e)))?
}

/// Generate the archive and write it to `output_path`.
///
/// Uses atomic write (temp file in the target directory, then persist) so a
/// failed run never leaves a truncated ZIP behind.
pub async fn generate_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationStats, Pg13Error> {
    let path = path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let output = generate_sync(&path, &config)?;
        write_archive(&output, &output_path)?;
        Ok(output.stats)
    })
    .await
    .map_err(|e| Pg13Error::Internal(format!("Generation task panicked: {}", e)))?
}

/// Generate the archive from uploaded bytes.
///
/// `file_name` is the name the upload arrived with; its extension decides
/// how the bytes are read. The bytes are staged in a scratch directory owned
/// by this call and removed before it returns.
///
/// # Example
/// ```rust,no_run
/// use seaduty_pg13::{generate_from_bytes, GeneratorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("sea_duty.pdf")?;
/// let output = generate_from_bytes(&bytes, "sea_duty.pdf", &GeneratorConfig::default()).await?;
/// std::fs::write(&output.archive_name, &output.archive)?;
/// # Ok(())
/// # }
/// ```
pub async fn generate_from_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Pg13Error> {
    let bytes = bytes.to_vec();
    let file_name = file_name.to_string();
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        info!("Starting generation from upload: {}", file_name);
        let staged = input::stage_upload(&bytes, &file_name)?;
        run(&staged, Path::new(&file_name), &config)
    })
    .await
    .map_err(|e| Pg13Error::Internal(format!("Generation task panicked: {}", e)))?
}

/// Write a generated archive to `output_path` atomically.
///
/// The bytes go to a temp file in the target directory which is then
/// persisted over the target, so a failed write never leaves a truncated ZIP.
pub fn write_archive(
    output: &GenerationOutput,
    output_path: impl AsRef<Path>,
) -> Result<(), Pg13Error> {
    let output_path = output_path.as_ref();
    write_atomic(output_path, &output.archive)?;
    info!("Wrote {}", output_path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn selection_limit(selection: SailorSelection) -> Option<usize> {
    match selection {
        SailorSelection::First => Some(1),
        SailorSelection::All => None,
    }
}

struct Extraction {
    sailors: Vec<Sailor>,
    pages_scanned: usize,
}

/// Scan the resolved sheet. With `limit`, scanning stops as soon as that
/// many sailors have been found.
fn extract(
    resolved: &ResolvedInput,
    config: &GeneratorConfig,
    limit: Option<usize>,
) -> Result<Extraction, Pg13Error> {
    let path = resolved.path();
    match resolved.kind() {
        InputKind::Pdf => {
            let doc = layout::load_document(path)?;
            let total_pages = doc.get_pages().len();
            let indices = config.pages.to_indices(total_pages);
            info!("PDF has {} pages, scanning {}", total_pages, indices.len());
            Ok(scan(layout::pdf_pages(&doc, indices, config), config, limit))
        }
        InputKind::Text => {
            let text = read_text(path)?;
            let total_pages = layout::text_page_count(&text);
            let indices = config.pages.to_indices(total_pages);
            info!("Text dump has {} pages, scanning {}", total_pages, indices.len());
            Ok(scan(layout::text_pages(&text, &indices), config, limit))
        }
    }
}

fn scan<I>(pages: I, config: &GeneratorConfig, limit: Option<usize>) -> Extraction
where
    I: IntoIterator<Item = PageText>,
{
    let mut blocks = sailor_blocks(pages, config);
    let sailors: Vec<Sailor> = blocks
        .by_ref()
        .take(limit.unwrap_or(usize::MAX))
        .map(Sailor::from)
        .collect();
    Extraction {
        sailors,
        pages_scanned: blocks.pages_scanned(),
    }
}

/// Read a text dump, falling back to Windows-1252 when it is not UTF-8.
fn read_text(path: &Path) -> Result<String, Pg13Error> {
    let bytes = std::fs::read(path).map_err(|e| input::read_error(path, e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => WINDOWS_1252.decode(e.as_bytes()).0.into_owned(),
    })
}

fn run(
    resolved: &ResolvedInput,
    source: &Path,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Pg13Error> {
    let total_start = Instant::now();

    // ── Step 1: Extract sailors ──────────────────────────────────────────
    let extract_start = Instant::now();
    let Extraction {
        sailors,
        pages_scanned,
    } = extract(resolved, config, selection_limit(config.selection))?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Found {} sailors in {} pages ({}ms)",
        sailors.len(),
        pages_scanned,
        extract_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(pages_scanned, sailors.len());
    }

    // ── Step 2: Select sailors ───────────────────────────────────────────
    let Some(first) = sailors.first() else {
        return Err(Pg13Error::NoSailorsFound {
            path: source.to_path_buf(),
        });
    };
    let selected: Vec<&Sailor> = sailors
        .iter()
        .filter(|s| {
            if s.assignments.is_empty() {
                debug!("Sailor {} has no assignments; no forms", s.name);
            }
            !s.assignments.is_empty()
        })
        .collect();
    if selected.is_empty() {
        return Err(Pg13Error::NoAssignments {
            name: first.name.clone(),
        });
    }

    // ── Step 3: Render forms ─────────────────────────────────────────────
    let render_start = Instant::now();
    let form_source = FormSource::load(config.template_path.as_deref())?;
    let total: usize = selected.iter().map(|s| s.assignments.len()).sum();
    let mut forms = Vec::with_capacity(total);

    for sailor in &selected {
        for assignment in &sailor.assignments {
            let index = forms.len() + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_form_start(index, total, &sailor.name, &assignment.ship);
            }
            let values = FormValues::new(&sailor.name, assignment);
            let bytes = render::render_form(&form_source, &config.fields, &values)?;
            let file_name = render::form_file_name(&assignment.ship);
            debug!("Rendered {} for {} ({} bytes)", file_name, sailor.name, bytes.len());
            if let Some(ref cb) = config.progress_callback {
                cb.on_form_complete(index, total, &file_name);
            }
            forms.push(RenderedForm {
                file_name,
                sailor: sailor.name.clone(),
                assignment: assignment.clone(),
                bytes,
            });
        }
    }

    // ── Step 4: Archive ──────────────────────────────────────────────────
    let (archive_name, entries) = archive::plan_entries(&forms, config.selection);
    let archive_bytes = archive::build_archive(&entries)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = GenerationStats {
        pages_scanned,
        sailors_found: sailors.len(),
        sailors_processed: selected.len(),
        forms_rendered: forms.len(),
        extract_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Generation complete: {} forms for {} sailors in {}, {}ms total",
        stats.forms_rendered, stats.sailors_processed, archive_name, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(&archive_name, entries.len());
    }

    Ok(GenerationOutput {
        archive_name,
        archive: archive_bytes,
        forms: entries.into_iter().map(|e| e.name).collect(),
        sailors,
        stats,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pg13Error> {
    let failed = |source: std::io::Error| Pg13Error::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SHEET: &str = "SEA DUTY CERTIFICATION SHEET\n\
        Name: DOE, JOHN A SSN: ***-**-1234\n\
        3/4/2024\tUSS COLE\t\t0800\t1600\n\
        3/9/2024\tUSS COLE\n\
        3/12/24\tLAKE ERIE\t(ASW C-1)\n\
        3/13/2024\tASW MITE\n\
        SIGNATURE OF CERTIFYING OFFICER\n\
        \u{c}Name: ROE, JANE SSN: ***-**-5678\n\
        4/1/2024 USS PAUL\n\
        HAMILTON\n\
        SIGNATURE OF CERTIFYING OFFICER\n";

    fn write_sheet(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("sheet.txt");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn extract_groups_assignments_per_sailor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let sailors = extract_sailors(&path, &GeneratorConfig::default()).unwrap();

        assert_eq!(sailors.len(), 2);
        assert_eq!(sailors[0].name, "DOE, JOHN A");
        let ships: Vec<&str> = sailors[0].assignments.iter().map(|a| a.ship.as_str()).collect();
        assert_eq!(ships, vec!["USS COLE", "LAKE ERIE"]);
        assert_eq!(sailors[1].assignments[0].ship, "USS PAUL HAMILTON");
    }

    #[test]
    fn all_selection_archives_every_sailor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let output = generate_sync(&path, &GeneratorConfig::default()).unwrap();

        assert_eq!(output.archive_name, "PG13.zip");
        assert_eq!(
            output.forms,
            vec!["DOE/USS COLE.pdf", "DOE/LAKE ERIE.pdf", "ROE/USS PAUL HAMILTON.pdf"]
        );
        assert_eq!(output.stats.pages_scanned, 2);
        assert_eq!(output.stats.sailors_processed, 2);
        assert_eq!(output.stats.forms_rendered, 3);

        let zip = zip::ZipArchive::new(Cursor::new(output.archive)).unwrap();
        assert_eq!(zip.len(), 3);
    }

    #[test]
    fn first_selection_stops_after_one_sailor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let config = GeneratorConfig::builder()
            .selection(SailorSelection::First)
            .build()
            .unwrap();
        let output = generate_sync(&path, &config).unwrap();

        assert_eq!(output.archive_name, "DOE.zip");
        assert_eq!(output.forms, vec!["USS COLE.pdf", "LAKE ERIE.pdf"]);
        assert_eq!(output.sailors.len(), 1);
        assert_eq!(output.stats.pages_scanned, 1);
    }

    #[test]
    fn page_selection_limits_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let config = GeneratorConfig::builder()
            .pages(crate::config::PageSelection::Single(2))
            .build()
            .unwrap();
        let sailors = extract_sailors(&path, &config).unwrap();
        let names: Vec<&str> = sailors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ROE, JANE"]);
    }

    #[test]
    fn sheet_without_sailors_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), "DATE SHIP\n3/4/2024 USS COLE\n");
        let err = generate_sync(&path, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, Pg13Error::NoSailorsFound { .. }));
    }

    #[test]
    fn sailor_without_assignments_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(
            dir.path(),
            "Name: DOE, JOHN\n3/4/2024 ASW MITE\nSIGNATURE OF CERTIFYING OFFICER\n",
        );
        let err = generate_sync(&path, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, Pg13Error::NoAssignments { ref name } if name == "DOE, JOHN"));
    }

    #[test]
    fn latin1_text_dump_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        std::fs::write(&path, b"Name: DOE, JOHN\n3/4/2024 \xfe USS COLE\n").unwrap();
        let sailors = extract_sailors(&path, &GeneratorConfig::default()).unwrap();
        assert_eq!(sailors[0].assignments[0].ship, "USS COLE");
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/nested/DOE.zip");
        write_atomic(&target, b"PK").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"PK");
    }

    #[test]
    fn extract_honours_first_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let config = GeneratorConfig::builder()
            .selection(SailorSelection::First)
            .build()
            .unwrap();
        let sailors = extract_sailors(&path, &config).unwrap();
        let names: Vec<&str> = sailors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["DOE, JOHN A"]);

        let generated = generate_sync(&path, &config).unwrap();
        assert_eq!(generated.sailors, sailors);
    }

    #[test]
    fn write_archive_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), SHEET);
        let output = generate_sync(&path, &GeneratorConfig::default()).unwrap();
        let target = dir.path().join(&output.archive_name);
        std::fs::write(&target, b"stale").unwrap();

        write_archive(&output, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), output.archive);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2, "only the sheet and the archive remain");
    }

    #[test]
    fn unreadable_text_dump_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        std::fs::create_dir(&path).unwrap();
        let err = generate_sync(&path, &GeneratorConfig::default()).unwrap_err();
        assert!(
            matches!(err, Pg13Error::InputUnreadable { .. }),
            "got: {err:?}"
        );
    }
}
