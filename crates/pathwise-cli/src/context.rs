//! Shared setup for commands: configuration, content, and the progress store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use pathwise_core::progression::ProgressionTracker;
use pathwise_core::repository::ContentRepository;
use pathwise_core::scoring::QuizScorer;
use pathwise_core::traits::{ProgressStore, StoreListener};
use pathwise_store::config::{create_store, load_config_from, PathwiseConfig};

/// Context attached when content cannot be loaded or validated.
#[derive(Debug)]
pub struct ContentUnavailable(pub PathBuf);

impl fmt::Display for ContentUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content unavailable: {}", self.0.display())
    }
}

/// Everything a command needs, resolved once from flags and config.
pub struct Context {
    pub config: PathwiseConfig,
}

/// A tracker wired to the configured store, with one learner's saved
/// progress already installed.
pub struct Session {
    pub tracker: ProgressionTracker,
    pub store: Arc<dyn ProgressStore>,
}

impl Context {
    /// Load config, then apply command-line overrides.
    pub fn load(config_path: Option<&Path>, content: Option<PathBuf>) -> Result<Self> {
        let mut config = load_config_from(config_path)?;
        if let Some(content) = content {
            config.content = content;
        }
        Ok(Self { config })
    }

    pub fn content_path(&self) -> &Path {
        &self.config.content
    }

    pub fn repository(&self) -> Result<ContentRepository> {
        ContentRepository::from_path(&self.config.content)
            .context(ContentUnavailable(self.config.content.clone()))
    }

    pub fn scorer(&self) -> QuizScorer {
        QuizScorer::new(self.config.scoring)
    }

    /// Open a progression session for `learner_id`.
    pub fn session(&self, learner_id: &str) -> Result<Session> {
        let repo = Arc::new(self.repository()?);
        let store = create_store(&self.config.store);

        let tracker = ProgressionTracker::new(repo)
            .with_policy(self.config.unlock_policy)
            .with_listener(Arc::new(StoreListener(store.clone())));

        if let Some(saved) = store
            .load(learner_id)
            .with_context(|| format!("failed to load progress for learner '{learner_id}'"))?
        {
            tracker.hydrate(saved);
        }

        tracing::debug!(learner_id, store = store.name(), "session opened");
        Ok(Session { tracker, store })
    }
}
