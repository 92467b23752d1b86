//! Progress-callback trait for generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] to hear about
//! each stage as the pipeline runs. The CLI uses it to drive a progress bar;
//! library callers can forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use seaduty_pg13::{GenerationProgressCallback, GeneratorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_form_complete(&self, index: usize, total: usize, file_name: &str) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index, total, file_name);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = GeneratorConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline at each stage.
///
/// Implementations must be `Send + Sync` because the async entry points run
/// the pipeline on a blocking worker thread. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once the whole sheet has been scanned.
    ///
    /// # Arguments
    /// * `pages_scanned`: pages read from the document
    /// * `sailors_found`: sailor blocks detected
    fn on_extraction_complete(&self, pages_scanned: usize, sailors_found: usize) {
        let _ = (pages_scanned, sailors_found);
    }

    /// Called just before a PG-13 is rendered.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position among the forms of this run
    /// * `total`: number of forms this run will render
    /// * `sailor`: sailor name as extracted
    /// * `ship`: normalised ship name
    fn on_form_start(&self, index: usize, total: usize, sailor: &str, ship: &str) {
        let _ = (index, total, sailor, ship);
    }

    /// Called when a PG-13 has been rendered.
    fn on_form_complete(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called once the archive is assembled.
    ///
    /// # Arguments
    /// * `archive_name`: suggested file name of the ZIP
    /// * `forms`: entries written to the archive
    fn on_generation_complete(&self, archive_name: &str, forms: usize) {
        let _ = (archive_name, forms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl GenerationProgressCallback for Recorder {
        fn on_form_start(&self, index: usize, total: usize, _sailor: &str, ship: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {index}/{total} {ship}"));
        }
    }

    #[test]
    fn noop_callback_accepts_every_event() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_complete(2, 1);
        cb.on_form_start(1, 1, "DOE, JOHN", "USS COLE");
        cb.on_form_complete(1, 1, "USS COLE.pdf");
        cb.on_generation_complete("DOE.zip", 1);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_form_start(2, 3, "DOE, JOHN", "LAKE ERIE");
        cb.on_form_complete(2, 3, "LAKE ERIE.pdf");
        assert_eq!(*rec.events.lock().unwrap(), vec!["start 2/3 LAKE ERIE"]);
    }
}
