//! Library-level flow over the sample curriculum: score, record, persist,
//! reload in a fresh tracker.

use std::path::Path;
use std::sync::Arc;

use pathwise_core::progression::{LessonState, PathStatus, UnlockPolicy};
use pathwise_core::scoring::{parse_answers, QuizScorer};
use pathwise_core::traits::{ProgressStore, StoreListener};
use pathwise_core::{ContentRepository, LessonId, ProgressionError, ProgressionTracker};
use pathwise_store::{JsonFileStore, MemoryStore};

fn sample_repo() -> Arc<ContentRepository> {
    let repo = ContentRepository::from_path(Path::new("../../content/sample-curriculum.json"))
        .expect("sample content loads");
    Arc::new(repo)
}

fn id(s: &str) -> LessonId {
    s.parse().unwrap()
}

#[test]
fn sample_curriculum_shape() {
    let repo = sample_repo();
    assert_eq!(repo.len(), 5);
    assert_eq!(repo.list_paths().len(), 2);
    assert!(repo.lint().is_empty());
    assert_eq!(repo.get_quiz("1.1").unwrap().title, "Quiz 1.1: Introductions");
}

#[test]
fn progress_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let repo = sample_repo();

    let store: Arc<dyn ProgressStore> = Arc::new(JsonFileStore::new(dir.path()));
    let tracker = ProgressionTracker::new(repo.clone())
        .with_listener(Arc::new(StoreListener(store.clone())));

    let answers = parse_answers(
        r#"{"1": "is", "2": "I am a junior analyst.", "3": "It's a pleasure to meet you.",
            "4": "are not", "5": "He"}"#,
    )
    .unwrap();
    let result = QuizScorer::default().score(repo.get_quiz("1.1").unwrap(), &answers);
    assert_eq!(result.percentage, 100);

    let completion = tracker.record_completion("ana", "1.1", &result).unwrap();
    assert_eq!(completion.newly_unlocked, Some(id("1.2")));
    assert!(dir.path().join("ana.json").exists());

    // A new process: fresh tracker, same directory.
    let store = JsonFileStore::new(dir.path());
    let saved = store.load("ana").unwrap().expect("progress was written through");
    let restarted = ProgressionTracker::new(repo);
    assert_eq!(restarted.hydrate(saved), 0);

    assert_eq!(restarted.lesson_state("ana", "1.1").unwrap(), LessonState::Completed);
    assert_eq!(restarted.lesson_state("ana", "1.2").unwrap(), LessonState::Unlocked);
    let summary = restarted.get_progress("ana");
    assert_eq!(summary.completed_count, 1);
    assert_eq!(summary.next_lesson_id, Some(id("1.2")));
    assert_eq!(summary.percent_per_path[0].status, PathStatus::InProgress);
    assert_eq!(store.list_learners().unwrap(), vec!["ana".to_string()]);
}

#[test]
fn whole_curriculum_in_order() {
    let repo = sample_repo();
    let store = Arc::new(MemoryStore::new());
    let tracker = ProgressionTracker::new(repo.clone())
        .with_listener(Arc::new(StoreListener(store.clone())));
    let scorer = QuizScorer::default();

    for lesson in repo.list_lesson_ids() {
        let quiz = repo.get_quiz(&lesson.to_string()).unwrap();
        let result = scorer.score(quiz, &Default::default());
        tracker
            .record_completion("ana", &lesson.to_string(), &result)
            .unwrap();
    }

    let summary = tracker.get_progress("ana");
    assert_eq!(summary.completed_count, 5);
    assert_eq!(summary.overall_percent, 100);
    assert_eq!(summary.next_lesson_id, None);
    assert!(summary
        .percent_per_path
        .iter()
        .all(|p| p.status == PathStatus::Completed));
    assert_eq!(store.save_count(), 5);
}

#[test]
fn skipping_ahead_is_rejected() {
    let tracker = ProgressionTracker::new(sample_repo());
    let result = QuizScorer::default().score(
        tracker.repository().get_quiz("2.1").unwrap(),
        &Default::default(),
    );

    let err = tracker.record_completion("ana", "2.1", &result).unwrap_err();
    assert!(matches!(err, ProgressionError::InvalidTransition(_)));
    assert_eq!(tracker.snapshot("ana").completed_lesson_ids.len(), 0);
}

/// Opens a tracker the way the CLI does for one command: fresh tracker,
/// store-backed listener, saved progress hydrated.
fn open_session(repo: &Arc<ContentRepository>, dir: &Path, learner: &str) -> ProgressionTracker {
    let store: Arc<dyn ProgressStore> = Arc::new(JsonFileStore::new(dir));
    let tracker = ProgressionTracker::new(repo.clone())
        .with_policy(UnlockPolicy::Open)
        .with_listener(Arc::new(StoreListener(store.clone())));
    if let Some(saved) = store.load(learner).unwrap() {
        tracker.hydrate(saved);
    }
    tracker
}

#[test]
fn overlapping_sessions_keep_both_completions() {
    let dir = tempfile::tempdir().unwrap();
    let repo = sample_repo();
    let scorer = QuizScorer::default();
    let empty = Default::default();

    // Both sessions load before either records anything.
    let first = open_session(&repo, dir.path(), "ana");
    let second = open_session(&repo, dir.path(), "ana");

    let result = scorer.score(repo.get_quiz("1.1").unwrap(), &empty);
    first.record_completion("ana", "1.1", &result).unwrap();
    let result = scorer.score(repo.get_quiz("2.1").unwrap(), &empty);
    second.record_completion("ana", "2.1", &result).unwrap();

    let saved = JsonFileStore::new(dir.path()).load("ana").unwrap().unwrap();
    assert!(saved.is_completed(id("1.1")));
    assert!(saved.is_completed(id("2.1")));
    assert_eq!(saved.scores.len(), 2);

    let later = open_session(&repo, dir.path(), "ana");
    assert_eq!(later.get_progress("ana").completed_count, 2);
}
