//! CLI binary for seaduty-pg13.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GeneratorConfig` and writes the archive.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use seaduty_pg13::pipeline::dates::format_mmddyy;
use seaduty_pg13::{
    generate, generate_to_file, inspect, write_archive, FormFields, GenerationProgressCallback,
    GeneratorConfig, PageSelection, ProgressCallback, SailorSelection,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the sheet is scanned, then a
/// bar over the forms being rendered.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Reading certification sheet…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} forms  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, pages_scanned: usize, sailors_found: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Found {sailors_found} sailors in {pages_scanned} pages"
            ))
        ));
    }

    fn on_form_start(&self, index: usize, total: usize, sailor: &str, ship: &str) {
        if index == 1 {
            self.activate_bar(total);
        }
        self.bar.set_message(format!("{sailor} · {ship}"));
    }

    fn on_form_complete(&self, _index: usize, _total: usize, file_name: &str) {
        self.bar
            .println(format!("  {} {}", green("✓"), dim(file_name)));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, archive_name: &str, forms: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} forms archived as {}",
            green("✔"),
            bold(&forms.to_string()),
            bold(archive_name)
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PG-13 per ship for every sailor on the sheet
  pg13 sea_duty.pdf --template NAVPERS_1070_613_TEMPLATE.pdf

  # Write the archive to a specific path
  pg13 sea_duty.pdf -o out/PG13.zip

  # Only the first sailor on the sheet
  pg13 --first-only sea_duty.pdf

  # List sailors and ship assignments without rendering
  pg13 --inspect-only sea_duty.pdf

  # Keep ASW MITE rows
  pg13 --skip-keyword "" sea_duty.pdf

  # Layout-preserving text dump instead of the PDF
  pg13 sea_duty.txt --pages 2-3

ENVIRONMENT VARIABLES:
  PG13_TEMPLATE           PG-13 template with AcroForm fields
  PG13_OUTPUT             Output ZIP path
  PG13_SKIP_KEYWORD       Rows containing this keyword are ignored (default MITE)
  RUST_LOG                Overrides the log filter
"#;

/// Generate PG-13 sea pay forms from a Sea Duty Certification Sheet.
#[derive(Parser, Debug)]
#[command(
    name = "pg13",
    version,
    about = "Generate PG-13 sea pay forms from a Sea Duty Certification Sheet",
    long_about = "Read a Sea Duty Certification Sheet (PDF or text dump), group each sailor's \
certified days by ship, and write one filled PG-13 (NAVPERS 1070/613) per ship assignment \
into a ZIP archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Certification sheet (.pdf, or .txt text dump).
    input: PathBuf,

    /// Write the ZIP to this path instead of `<archive name>` in the
    /// current directory.
    #[arg(short, long, env = "PG13_OUTPUT")]
    output: Option<PathBuf>,

    /// PG-13 template with AcroForm fields. Without it a plain certificate
    /// page is drawn.
    #[arg(long, env = "PG13_TEMPLATE")]
    template: Option<PathBuf>,

    /// Prefix of the line that opens a sailor block.
    #[arg(long, env = "PG13_NAME_PREFIX", default_value = seaduty_pg13::config::DEFAULT_NAME_PREFIX)]
    name_prefix: String,

    /// Marker on the name line where the SSN starts.
    #[arg(long, env = "PG13_SSN_MARKER", default_value = seaduty_pg13::config::DEFAULT_SSN_MARKER)]
    ssn_marker: String,

    /// Substring of the line that closes a sailor block.
    #[arg(long, env = "PG13_SIGNATURE_MARKER", default_value = seaduty_pg13::config::DEFAULT_SIGNATURE_MARKER)]
    signature_marker: String,

    /// Rows whose ship text contains this keyword are ignored; empty keeps all.
    #[arg(long, env = "PG13_SKIP_KEYWORD", default_value = seaduty_pg13::config::DEFAULT_SKIP_KEYWORD)]
    skip_keyword: String,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PG13_PAGES", default_value = "all")]
    pages: String,

    /// Only the first sailor on the sheet gets forms.
    #[arg(long, env = "PG13_FIRST_ONLY")]
    first_only: bool,

    /// AcroForm field for the sailor name.
    #[arg(long, env = "PG13_NAME_FIELD", default_value = "NAME")]
    name_field: String,

    /// AcroForm field for the first remarks line.
    #[arg(long, env = "PG13_DATE_FIELD", default_value = "Date")]
    date_field: String,

    /// AcroForm field for the ship name.
    #[arg(long, env = "PG13_SHIP_FIELD", default_value = "SHIP")]
    ship_field: String,

    /// AcroForm field for the subject line.
    #[arg(long, env = "PG13_SUBJECT_FIELD", default_value = "Subject")]
    subject_field: String,

    /// Output structured JSON (sailors, forms, stats) on stdout.
    #[arg(long, env = "PG13_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PG13_NO_PROGRESS")]
    no_progress: bool,

    /// List sailors and assignments only, no forms.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PG13_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PG13_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let sailors = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect certification sheet")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&sailors).context("Failed to serialise sailors")?
            );
        } else {
            println!("File:     {}", cli.input.display());
            println!("Sailors:  {}", sailors.len());
            for sailor in &sailors {
                println!();
                println!("{}", bold(&sailor.name));
                if sailor.assignments.is_empty() {
                    println!("  {}", dim("(no assignments)"));
                }
                for a in &sailor.assignments {
                    println!(
                        "  {:<28} {} TO {}",
                        a.ship,
                        format_mmddyy(a.start),
                        format_mmddyy(a.end)
                    );
                }
            }
        }
        return Ok(());
    }

    // ── Run generation ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = generate_to_file(&cli.input, output_path, &config)
            .await
            .context("Generation failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
            );
        } else if !cli.quiet {
            eprintln!(
                "{}  {} forms  {} sailors  {}ms  →  {}",
                green("✔"),
                stats.forms_rendered,
                stats.sailors_processed,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = generate(&cli.input, &config)
            .await
            .context("Generation failed")?;
        let target = PathBuf::from(&output.archive_name);
        write_archive(&output, &target)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else if !cli.quiet {
            eprintln!(
                "{}  {} forms  {} sailors  {}ms  →  {}",
                green("✔"),
                output.stats.forms_rendered,
                output.stats.sailors_processed,
                output.stats.total_duration_ms,
                bold(&target.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `GeneratorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GeneratorConfig> {
    let pages = parse_pages(&cli.pages)?;
    let selection = if cli.first_only {
        SailorSelection::First
    } else {
        SailorSelection::All
    };

    let mut builder = GeneratorConfig::builder()
        .name_prefix(cli.name_prefix.clone())
        .ssn_marker(cli.ssn_marker.clone())
        .signature_marker(cli.signature_marker.clone())
        .skip_keyword(cli.skip_keyword.clone())
        .pages(pages)
        .selection(selection)
        .fields(FormFields {
            name: cli.name_field.clone(),
            date: cli.date_field.clone(),
            ship: cli.ship_field.clone(),
            subject: cli.subject_field.clone(),
        });

    if let Some(ref template) = cli.template {
        builder = builder.template_path(template);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages("3").unwrap(), PageSelection::Single(3)));
        assert!(matches!(parse_pages("2-4").unwrap(), PageSelection::Range(2, 4)));
        assert!(matches!(parse_pages("1,3").unwrap(), PageSelection::Set(ref v) if v == &vec![1, 3]));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("4-2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn flags_map_to_config() {
        let cli = Cli::parse_from(["pg13", "sheet.pdf", "--first-only", "--skip-keyword", ""]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.selection, SailorSelection::First);
        assert!(config.skip_keyword.is_none());
        assert_eq!(config.fields, FormFields::default());
    }
}
