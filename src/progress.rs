//! Progress-observer trait for pipeline events.
//!
//! Inject an [`ProgressHandle`] into [`crate::merge`], [`crate::preview`], or
//! [`crate::export`] to receive real-time events as the pipeline processes
//! each unit (an image during assembly, a page during preview/export).
//!
//! Progress has two phases, mirroring what a user watches: a byte-loading
//! phase while the source is read or downloaded, and a unit phase while pages
//! or images are processed one at a time. Units complete strictly in order,
//! so `on_unit_complete(n, _)` is called with monotonically increasing `n`.
//!
//! # Why a callback trait instead of channels?
//!
//! The trait is the least-invasive integration point: callers can forward
//! events to a terminal progress bar, a log, or a channel of their own
//! without the library knowing how the host application communicates. All
//! methods have default no-op implementations so callers only override what
//! they care about.

use std::sync::Arc;

/// Called by the pipelines as they make progress.
///
/// Implementations must be `Send + Sync`: events may be emitted from a
/// blocking worker thread while the caller awaits on the async side.
pub trait ProgressObserver: Send + Sync {
    /// Byte-loading phase: `loaded` bytes read or downloaded so far.
    /// `total` is `None` when the source size is unknown (chunked download).
    fn on_load_progress(&self, loaded: u64, total: Option<u64>) {
        let _ = (loaded, total);
    }

    /// Called once before any unit is processed, with the unit count.
    fn on_job_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called when a unit (page or image) has been fully processed.
    ///
    /// `unit` is 1-based and strictly increasing within a job.
    fn on_unit_complete(&self, unit: usize, total_units: usize) {
        let _ = (unit, total_units);
    }

    /// Called when a unit fails. The job aborts (assembly, export) or stops
    /// early (preview) after this event.
    fn on_unit_error(&self, unit: usize, total_units: usize, error: &str) {
        let _ = (unit, total_units, error);
    }

    /// Called once after all units have been processed.
    fn on_job_complete(&self, total_units: usize, succeeded: usize) {
        let _ = (total_units, succeeded);
    }

    /// Called when a preview is cancelled, with the count of pages that were
    /// fully rendered before the token was observed.
    fn on_cancelled(&self, completed_units: usize) {
        let _ = completed_units;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// Convenience alias for the shared observer passed into the pipelines.
pub type ProgressHandle = Arc<dyn ProgressObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct TrackingObserver {
        loaded: AtomicU64,
        started_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        cancelled_at: AtomicUsize,
    }

    impl ProgressObserver for TrackingObserver {
        fn on_load_progress(&self, loaded: u64, _total: Option<u64>) {
            self.loaded.store(loaded, Ordering::SeqCst);
        }

        fn on_job_start(&self, total_units: usize) {
            self.started_total.store(total_units, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _unit: usize, _total_units: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _unit: usize, _total_units: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_cancelled(&self, completed_units: usize) {
            self.cancelled_at.store(completed_units, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopProgress;
        obs.on_load_progress(512, Some(1024));
        obs.on_job_start(5);
        obs.on_unit_complete(1, 5);
        obs.on_unit_error(2, 5, "boom");
        obs.on_job_complete(5, 4);
        obs.on_cancelled(2);
    }

    #[test]
    fn tracking_observer_receives_events() {
        let obs = TrackingObserver {
            loaded: AtomicU64::new(0),
            started_total: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            cancelled_at: AtomicUsize::new(0),
        };

        obs.on_load_progress(2048, Some(4096));
        assert_eq!(obs.loaded.load(Ordering::SeqCst), 2048);

        obs.on_job_start(3);
        obs.on_unit_complete(1, 3);
        obs.on_unit_complete(2, 3);
        obs.on_unit_error(3, 3, "render glitch");
        assert_eq!(obs.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(obs.completes.load(Ordering::SeqCst), 2);
        assert_eq!(obs.errors.load(Ordering::SeqCst), 1);

        obs.on_cancelled(2);
        assert_eq!(obs.cancelled_at.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: ProgressHandle = Arc::new(NoopProgress);
        obs.on_job_start(10);
        obs.on_unit_complete(1, 10);
    }
}
