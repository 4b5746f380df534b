//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`]. The
//! converter reports `(0, total)` once before the first page and
//! `(pages_done, total)` after every page. `total` is `None` when the
//! document's page count could not be determined.
//!
//! A callback that returns `Err` or panics is logged and ignored: progress
//! reporting never aborts a conversion.
//!
//! # Example
//!
//! ```rust
//! use slidenotes::{ConversionConfig, ProgressCallback, ProgressError};
//! use std::sync::Arc;
//!
//! let cb: ProgressCallback = Arc::new(|done: usize, total: Option<usize>| -> Result<(), ProgressError> {
//!     eprintln!("{done}/{}", total.map_or("?".to_string(), |t| t.to_string()));
//!     Ok(())
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(cb)
//!     .build()
//!     .unwrap();
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Error type a progress callback may return.
pub type ProgressError = Box<dyn std::error::Error + Send + Sync>;

/// Observer notified as pages complete.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called with the number of finished pages and the number of pages that
    /// will be processed in total.
    fn on_progress(
        &self,
        pages_done: usize,
        total_pages: Option<usize>,
    ) -> Result<(), ProgressError>;
}

impl<F> ConversionProgressCallback for F
where
    F: Fn(usize, Option<usize>) -> Result<(), ProgressError> + Send + Sync,
{
    fn on_progress(
        &self,
        pages_done: usize,
        total_pages: Option<usize>,
    ) -> Result<(), ProgressError> {
        self(pages_done, total_pages)
    }
}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Invoke `cb`, swallowing (and logging) any error or panic it raises.
pub(crate) fn report(cb: Option<&ProgressCallback>, pages_done: usize, total_pages: Option<usize>) {
    let Some(cb) = cb else {
        return;
    };
    match catch_unwind(AssertUnwindSafe(|| cb.on_progress(pages_done, total_pages))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Progress callback failed at {}: {}", pages_done, e),
        Err(_) => warn!("Progress callback panicked at {}", pages_done),
    }
}
