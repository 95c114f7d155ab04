//! Seams to the host application: progress listeners and progress stores.
//!
//! The store implementations live in `pathwise-store`.

use std::sync::Arc;

use crate::progression::LearnerProgress;

// ---------------------------------------------------------------------------
// Progress listener
// ---------------------------------------------------------------------------

/// Notified after every successful progression transition.
///
/// Called while the learner's lock is held, so snapshots for one learner
/// arrive in order. An error is logged by the tracker; it never reverts the
/// in-memory transition.
pub trait ProgressListener: Send + Sync {
    fn on_progress_changed(&self, learner_id: &str, snapshot: &LearnerProgress)
        -> anyhow::Result<()>;
}

/// A listener that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_progress_changed(&self, _: &str, _: &LearnerProgress) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress store
// ---------------------------------------------------------------------------

/// Durable storage for learner progress.
///
/// Every store is also a write-through [`ProgressListener`].
pub trait ProgressStore: ProgressListener {
    /// Human-readable store name (e.g. "json").
    fn name(&self) -> &str;

    /// Load a learner's saved progress, if any.
    fn load(&self, learner_id: &str) -> anyhow::Result<Option<LearnerProgress>>;

    /// Persist a learner's progress.
    ///
    /// Stores that can be shared by independent writers merge the snapshot
    /// into what they already hold (see [`LearnerProgress::merge`]) so that
    /// no completion is lost.
    fn save(&self, progress: &LearnerProgress) -> anyhow::Result<()>;

    /// Every learner with saved progress, sorted.
    fn list_learners(&self) -> anyhow::Result<Vec<String>>;
}

/// Adapts a shared store into the tracker's listener slot.
#[derive(Clone)]
pub struct StoreListener(pub Arc<dyn ProgressStore>);

impl ProgressListener for StoreListener {
    fn on_progress_changed(&self, learner_id: &str, snapshot: &LearnerProgress) -> anyhow::Result<()> {
        self.0.on_progress_changed(learner_id, snapshot)
    }
}
