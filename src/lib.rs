//! # seaduty-pg13
//!
//! Turn a Sea Duty Certification Sheet into filled PG-13 (NAVPERS 1070/613)
//! forms, one per ship assignment, bundled in a ZIP archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Certification sheet (.pdf / .txt)
//!  │
//!  ├─ 1. Input    check extension and readability
//!  ├─ 2. Layout   content stream → rows of cells (lopdf)
//!  ├─ 3. Extract  row scan: Name: … dated rows … SIGNATURE
//!  ├─ 4. Group    clean ship names, one date span per ship
//!  ├─ 5. Render   fill the PG-13 template per assignment
//!  └─ 6. Archive  one deflated ZIP
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seaduty_pg13::{generate, GeneratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeneratorConfig::builder()
//!         .template_path("NAVPERS_1070_613_TEMPLATE.pdf")
//!         .build()?;
//!     let output = generate("sea_duty.pdf", &config).await?;
//!     seaduty_pg13::write_archive(&output, &output.archive_name)?;
//!     eprintln!("{} forms for {} sailors",
//!         output.stats.forms_rendered,
//!         output.stats.sailors_processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pg13` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! seaduty-pg13 = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DateFormat, FormFields, GeneratorConfig, GeneratorConfigBuilder, PageSelection,
    SailorSelection,
};
pub use error::Pg13Error;
pub use generate::{
    extract_sailors, generate, generate_from_bytes, generate_sync, generate_to_file, inspect,
    write_archive,
};
pub use output::{GenerationOutput, GenerationStats, RenderedForm, Sailor, ShipAssignment};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
