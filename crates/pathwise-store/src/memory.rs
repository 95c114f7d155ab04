//! In-memory progress store for tests and stateless runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use pathwise_core::progression::LearnerProgress;
use pathwise_core::traits::{ProgressListener, ProgressStore};

use crate::error::validate_learner_id;

/// A progress store that keeps snapshots in a map.
///
/// Saves merge into the held snapshot. Counts saves so tests can assert on
/// write-through behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    learners: Mutex<BTreeMap<String, LearnerProgress>>,
    save_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves made to this store.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }
}

impl ProgressListener for MemoryStore {
    fn on_progress_changed(&self, _: &str, snapshot: &LearnerProgress) -> anyhow::Result<()> {
        self.save(snapshot)
    }
}

impl ProgressStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, learner_id: &str) -> anyhow::Result<Option<LearnerProgress>> {
        validate_learner_id(learner_id)?;
        Ok(self
            .learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(learner_id)
            .cloned())
    }

    fn save(&self, progress: &LearnerProgress) -> anyhow::Result<()> {
        validate_learner_id(&progress.learner_id)?;
        self.learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(progress.learner_id.clone())
            .and_modify(|stored| stored.merge(progress))
            .or_insert_with(|| progress.clone());
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn list_learners(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}
