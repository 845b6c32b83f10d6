//! Batch progress reporting.
//!
//! The pipeline reports one unit of work per finished document through
//! [`ProgressCallback`]. Rendering is left to the caller: the CLI draws
//! `indicatif` bars, tests and library users can pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a running batch.
///
/// Implementations must be `Send + Sync` so a single reporter can be
/// shared by every document in flight.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of documents in the batch.
    fn set_total(&self, total: u64);

    /// Advances by `delta` finished documents.
    fn inc(&self, delta: u64);

    /// Shows what is currently being worked on.
    fn set_message(&self, msg: String);

    /// Marks the batch as done with a closing message.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
