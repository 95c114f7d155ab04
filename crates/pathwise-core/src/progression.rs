//! Learner progression through the ordered curriculum.
//!
//! The tracker is the only stateful component in the core. State is scoped
//! per learner: each learner's progress sits behind its own mutex, so
//! submissions for one learner are serialized while different learners never
//! contend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransitionError, NotFoundError, ProgressionError};
use crate::lesson_id::LessonId;
use crate::repository::ContentRepository;
use crate::scoring::{self, ScoreResult};
use crate::traits::{NoopListener, ProgressListener};

/// Where a lesson stands for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    Locked,
    Unlocked,
    Completed,
}

impl fmt::Display for LessonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonState::Locked => write!(f, "locked"),
            LessonState::Unlocked => write!(f, "unlocked"),
            LessonState::Completed => write!(f, "completed"),
        }
    }
}

/// How lessons become reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockPolicy {
    /// One lesson at a time, one Path at a time.
    #[default]
    Linear,
    /// Free navigation: every lesson not yet completed is unlocked.
    Open,
}

impl fmt::Display for UnlockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockPolicy::Linear => write!(f, "linear"),
            UnlockPolicy::Open => write!(f, "open"),
        }
    }
}

/// The recorded quiz score for a completed lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonScore {
    pub correct_count: u32,
    pub total_count: u32,
    pub percentage: u8,
    pub passed: bool,
    pub recorded_at: DateTime<Utc>,
}

impl LessonScore {
    pub fn from_result(result: &ScoreResult) -> Self {
        Self {
            correct_count: result.correct_count,
            total_count: result.total_count,
            percentage: result.percentage,
            passed: result.passed,
            recorded_at: Utc::now(),
        }
    }
}

/// One learner's progress. This is the snapshot handed to listeners and
/// persisted by stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pub learner_id: String,
    #[serde(default)]
    pub completed_lesson_ids: BTreeSet<LessonId>,
    /// Last recorded score per lesson. Retakes replace the previous entry.
    #[serde(default)]
    pub scores: BTreeMap<LessonId, LessonScore>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LearnerProgress {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            completed_lesson_ids: BTreeSet::new(),
            scores: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn is_completed(&self, id: LessonId) -> bool {
        self.completed_lesson_ids.contains(&id)
    }

    /// Fold another snapshot of the same learner into this one.
    ///
    /// Completions only ever accumulate, so the result is the union of both
    /// completion sets with the most recently recorded score per lesson.
    /// Order of merging doesn't matter.
    pub fn merge(&mut self, other: &LearnerProgress) {
        self.completed_lesson_ids
            .extend(other.completed_lesson_ids.iter().copied());
        for (id, score) in &other.scores {
            match self.scores.get(id) {
                Some(mine) if mine.recorded_at >= score.recorded_at => {}
                _ => {
                    self.scores.insert(*id, score.clone());
                }
            }
        }
        self.updated_at = self.updated_at.max(other.updated_at);
    }
}

/// Coarse status of a Path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl PathStatus {
    fn from_counts(completed: usize, total: usize) -> Self {
        if completed == 0 {
            PathStatus::NotStarted
        } else if completed >= total {
            PathStatus::Completed
        } else {
            PathStatus::InProgress
        }
    }
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStatus::NotStarted => write!(f, "not started"),
            PathStatus::InProgress => write!(f, "in progress"),
            PathStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Completion figures for one Path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathProgress {
    pub path_number: u32,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub status: PathStatus,
}

/// Aggregate progress as shown to a learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub learner_id: String,
    pub completed_count: usize,
    pub total_count: usize,
    pub overall_percent: u8,
    pub percent_per_path: Vec<PathProgress>,
    /// First reachable, not yet completed lesson. `None` once everything is
    /// completed.
    pub next_lesson_id: Option<LessonId>,
}

/// What a successful `record_completion` changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub lesson_id: LessonId,
    pub score: LessonScore,
    /// The lesson had already been completed before.
    pub retake: bool,
    /// The lesson that became reachable because of this completion, if any.
    pub newly_unlocked: Option<LessonId>,
}

fn to_percent(completed: usize, total: usize) -> u8 {
    let clamp = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    scoring::percentage(clamp(completed), clamp(total))
}

/// A consistent read of one learner.
#[derive(Debug, Clone)]
pub struct LearnerView {
    pub progress: LearnerProgress,
    /// Every lesson's state, in curriculum order.
    pub states: Vec<(LessonId, LessonState)>,
    pub summary: ProgressSummary,
}

/// Tracks every learner's progress against one content repository.
pub struct ProgressionTracker {
    repo: Arc<ContentRepository>,
    policy: UnlockPolicy,
    learners: RwLock<HashMap<String, Arc<Mutex<LearnerProgress>>>>,
    listener: Arc<dyn ProgressListener>,
}

impl fmt::Debug for ProgressionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressionTracker")
            .field("lessons", &self.repo.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ProgressionTracker {
    pub fn new(repo: Arc<ContentRepository>) -> Self {
        Self {
            repo,
            policy: UnlockPolicy::default(),
            learners: RwLock::new(HashMap::new()),
            listener: Arc::new(NoopListener),
        }
    }

    pub fn with_policy(mut self, policy: UnlockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wire a persistence collaborator.
    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn repository(&self) -> &ContentRepository {
        &self.repo
    }

    pub fn policy(&self) -> UnlockPolicy {
        self.policy
    }

    fn resolve(&self, lesson_id: &str) -> Result<LessonId, NotFoundError> {
        lesson_id
            .parse::<LessonId>()
            .ok()
            .filter(|id| self.repo.lesson(*id).is_some())
            .ok_or_else(|| NotFoundError::Lesson(lesson_id.to_string()))
    }

    fn existing(&self, learner_id: &str) -> Option<Arc<Mutex<LearnerProgress>>> {
        self.learners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(learner_id)
            .cloned()
    }

    /// The learner's slot, created on first interaction.
    fn entry(&self, learner_id: &str) -> Arc<Mutex<LearnerProgress>> {
        if let Some(handle) = self.existing(learner_id) {
            return handle;
        }
        self.learners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LearnerProgress::new(learner_id))))
            .clone()
    }

    /// Run `f` against the learner's progress without creating it.
    fn read<T>(&self, learner_id: &str, f: impl FnOnce(&LearnerProgress) -> T) -> T {
        match self.existing(learner_id) {
            Some(handle) => {
                let progress = handle.lock().unwrap_or_else(PoisonError::into_inner);
                f(&progress)
            }
            None => f(&LearnerProgress::new(learner_id)),
        }
    }

    fn is_reachable(&self, progress: &LearnerProgress, id: LessonId) -> bool {
        match self.policy {
            UnlockPolicy::Open => true,
            UnlockPolicy::Linear => match self.repo.previous_in_path(id) {
                Some(prev) => progress.is_completed(prev),
                None => match self.repo.path_before(id.path()) {
                    Some(group) => group.lesson_ids.iter().all(|l| progress.is_completed(*l)),
                    None => true,
                },
            },
        }
    }

    fn state_in(&self, progress: &LearnerProgress, id: LessonId) -> LessonState {
        if progress.is_completed(id) {
            LessonState::Completed
        } else if self.is_reachable(progress, id) {
            LessonState::Unlocked
        } else {
            LessonState::Locked
        }
    }

    pub fn lesson_state(&self, learner_id: &str, lesson_id: &str) -> Result<LessonState, NotFoundError> {
        let id = self.resolve(lesson_id)?;
        Ok(self.read(learner_id, |p| self.state_in(p, id)))
    }

    /// Every lesson's state, in curriculum order.
    pub fn lesson_states(&self, learner_id: &str) -> Vec<(LessonId, LessonState)> {
        self.read(learner_id, |p| self.states_in(p))
    }

    fn states_in(&self, progress: &LearnerProgress) -> Vec<(LessonId, LessonState)> {
        self.repo
            .list_lesson_ids()
            .into_iter()
            .map(|id| (id, self.state_in(progress, id)))
            .collect()
    }

    /// Record a scored quiz submission as the lesson's completion.
    ///
    /// Fails without touching the learner's progress when the lesson is
    /// unknown or still locked. Completing an already completed lesson is a
    /// retake: the new score replaces the old one.
    pub fn record_completion(
        &self,
        learner_id: &str,
        lesson_id: &str,
        result: &ScoreResult,
    ) -> Result<Completion, ProgressionError> {
        let id = self.resolve(lesson_id)?;
        let handle = self.entry(learner_id);
        let mut progress = handle.lock().unwrap_or_else(PoisonError::into_inner);

        let state = self.state_in(&progress, id);
        if state == LessonState::Locked {
            tracing::debug!(learner_id, lesson_id = %id, "rejected completion of locked lesson");
            return Err(InvalidTransitionError {
                learner_id: learner_id.to_string(),
                lesson_id: id.to_string(),
            }
            .into());
        }

        let next = self
            .repo
            .next_lesson(id)
            .filter(|n| self.state_in(&progress, *n) == LessonState::Locked);

        let score = LessonScore::from_result(result);
        progress.completed_lesson_ids.insert(id);
        progress.scores.insert(id, score.clone());
        progress.updated_at = Some(score.recorded_at);

        let newly_unlocked = next.filter(|n| self.state_in(&progress, *n) == LessonState::Unlocked);

        tracing::info!(
            learner_id,
            lesson_id = %id,
            percentage = score.percentage,
            retake = state == LessonState::Completed,
            "lesson completed"
        );

        if let Err(e) = self.listener.on_progress_changed(learner_id, &progress) {
            tracing::warn!(learner_id, "failed to persist progress: {e:#}");
        }

        Ok(Completion {
            lesson_id: id,
            score,
            retake: state == LessonState::Completed,
            newly_unlocked,
        })
    }

    /// Completion counts per Path and the next lesson to take.
    pub fn get_progress(&self, learner_id: &str) -> ProgressSummary {
        self.read(learner_id, |p| self.summary_in(p))
    }

    fn summary_in(&self, p: &LearnerProgress) -> ProgressSummary {
        let percent_per_path: Vec<PathProgress> = self
            .repo
            .list_paths()
            .iter()
            .map(|group| {
                let total = group.lesson_ids.len();
                let completed = group.lesson_ids.iter().filter(|l| p.is_completed(**l)).count();
                PathProgress {
                    path_number: group.path_number,
                    completed,
                    total,
                    percent: to_percent(completed, total),
                    status: PathStatus::from_counts(completed, total),
                }
            })
            .collect();

        let completed_count: usize = percent_per_path.iter().map(|pp| pp.completed).sum();
        let total_count = self.repo.len();

        let next_lesson_id = self
            .repo
            .list_lesson_ids()
            .into_iter()
            .find(|id| self.state_in(p, *id) == LessonState::Unlocked);

        ProgressSummary {
            learner_id: p.learner_id.clone(),
            completed_count,
            total_count,
            overall_percent: to_percent(completed_count, total_count),
            percent_per_path,
            next_lesson_id,
        }
    }

    /// Progress, lesson states and summary taken under a single lock, so
    /// they always agree with each other.
    pub fn view(&self, learner_id: &str) -> LearnerView {
        self.read(learner_id, |p| LearnerView {
            progress: p.clone(),
            states: self.states_in(p),
            summary: self.summary_in(p),
        })
    }

    /// A copy of the learner's current progress.
    pub fn snapshot(&self, learner_id: &str) -> LearnerProgress {
        self.read(learner_id, |p| p.clone())
    }

    /// Install previously persisted progress, replacing any in-memory state.
    ///
    /// Lessons the repository doesn't know are dropped. Returns how many were
    /// dropped.
    pub fn hydrate(&self, mut progress: LearnerProgress) -> usize {
        let unknown: BTreeSet<LessonId> = progress
            .completed_lesson_ids
            .iter()
            .chain(progress.scores.keys())
            .copied()
            .filter(|id| self.repo.lesson(*id).is_none())
            .collect();
        progress
            .completed_lesson_ids
            .retain(|id| !unknown.contains(id));
        progress.scores.retain(|id, _| !unknown.contains(id));
        let dropped = unknown.len();
        if dropped > 0 {
            tracing::warn!(
                learner_id = %progress.learner_id,
                dropped,
                "dropped progress for lessons missing from content"
            );
        }

        let handle = self.entry(&progress.learner_id);
        *handle.lock().unwrap_or_else(PoisonError::into_inner) = progress;
        dropped
    }

    /// Learners seen so far, sorted.
    pub fn learners(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .learners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
