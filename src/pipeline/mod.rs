//! Pipeline stages for certification-sheet-to-PG-13 generation.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ layout ──▶ extract ──▶ group ──▶ render ──▶ archive
//! (path)    (lopdf)    (scan)      (spans)   (PG-13)    (zip)
//! ```
//!
//! 1. [`input`]: check the extension and readability of the sheet, or
//!    stage uploaded bytes into a temp dir
//! 2. [`layout`]: replay each page's content stream into rows of cells;
//!    `.txt` dumps are split on form feeds and tabs instead
//! 3. [`extract`]: row-scan state machine yielding one raw sailor block at
//!    a time; dates are parsed by [`dates`]
//! 4. [`group`]: clean ship names with [`normalize`] and collapse events
//!    into one date span per ship
//! 5. [`render`]: fill the PG-13 template (or draw a certificate) per
//!    assignment
//! 6. [`archive`]: name the entries and write them into one ZIP

pub mod archive;
pub mod dates;
pub mod extract;
pub mod group;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod render;
