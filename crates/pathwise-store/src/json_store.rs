//! Directory-backed progress store: one JSON file per learner.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use pathwise_core::progression::LearnerProgress;
use pathwise_core::traits::{ProgressListener, ProgressStore};

use crate::error::{validate_learner_id, StoreError};

/// How long a writer waits for a learner's lock file.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// A lock file older than this is left over from a crashed writer.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
const LOCK_RETRY: Duration = Duration::from_millis(10);

/// Exclusive per-learner lock held as `<dir>/<learner_id>.lock`. Removed on
/// drop.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        let deadline = SystemTime::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(JsonFileStore::io_error(&path, e)),
            }

            let stale = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > LOCK_STALE_AFTER);
            if stale {
                tracing::warn!(path = %path.display(), "removing stale lock file");
                let _ = std::fs::remove_file(&path);
                continue;
            }

            if SystemTime::now() >= deadline {
                return Err(StoreError::Locked {
                    path: path.display().to_string(),
                });
            }
            thread::sleep(LOCK_RETRY);
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

/// Stores each learner's progress as `<dir>/<learner_id>.json`.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written snapshot behind. Each save
/// holds the learner's lock file while it re-reads the stored snapshot and
/// merges into it, so processes sharing the directory never drop each
/// other's completions.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file a learner's progress lives in.
    pub fn path_for(&self, learner_id: &str) -> Result<PathBuf, StoreError> {
        validate_learner_id(learner_id)?;
        Ok(self.dir.join(format!("{learner_id}.json")))
    }

    fn lock_path(&self, learner_id: &str) -> PathBuf {
        self.dir.join(format!("{learner_id}.lock"))
    }

    fn write_atomic(&self, path: &Path, progress: &LearnerProgress) -> anyhow::Result<()> {
        let json =
            serde_json::to_string_pretty(progress).context("failed to serialize progress")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| Self::io_error(&self.dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Self::io_error(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| Self::io_error(path, e.error))?;
        Ok(())
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl ProgressListener for JsonFileStore {
    fn on_progress_changed(&self, _: &str, snapshot: &LearnerProgress) -> anyhow::Result<()> {
        self.save(snapshot)
    }
}

impl ProgressStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, learner_id: &str) -> anyhow::Result<Option<LearnerProgress>> {
        let path = self.path_for(learner_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&path, e).into()),
        };

        let progress: LearnerProgress =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        if progress.learner_id != learner_id {
            return Err(StoreError::LearnerMismatch {
                path: path.display().to_string(),
                expected: learner_id.to_string(),
                found: progress.learner_id,
            }
            .into());
        }

        tracing::debug!(learner_id, path = %path.display(), "loaded progress");
        Ok(Some(progress))
    }

    fn save(&self, progress: &LearnerProgress) -> anyhow::Result<()> {
        let path = self.path_for(&progress.learner_id)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;

        let _lock = LockFile::acquire(self.lock_path(&progress.learner_id))?;

        let merged = match self.load(&progress.learner_id)? {
            Some(mut stored) => {
                stored.merge(progress);
                stored
            }
            None => progress.clone(),
        };
        self.write_atomic(&path, &merged)?;

        tracing::debug!(
            learner_id = %progress.learner_id,
            path = %path.display(),
            completed = merged.completed_lesson_ids.len(),
            "saved progress"
        );
        Ok(())
    }

    fn list_learners(&self) -> anyhow::Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&self.dir, e).into()),
        };

        let mut learners = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Self::io_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                learners.push(stem.to_string());
            }
        }
        learners.sort();
        Ok(learners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathwise_core::LessonId;

    fn progress_with(learner: &str, lesson: &str) -> LearnerProgress {
        let mut p = LearnerProgress::new(learner);
        p.completed_lesson_ids.insert(lesson.parse::<LessonId>().unwrap());
        p
    }

    #[test]
    fn missing_learner_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("progress"));
        assert!(store.load("ana").unwrap().is_none());
        assert!(store.list_learners().unwrap().is_empty());
    }

    #[test]
    fn save_creates_dir_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/progress"));
        let progress = progress_with("ana", "2.10");

        store.save(&progress).unwrap();
        assert!(dir.path().join("nested/progress/ana.json").exists());
        assert_eq!(store.load("ana").unwrap(), Some(progress));
    }

    #[test]
    fn save_merges_with_stored_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save(&progress_with("ana", "1.1")).unwrap();
        store.save(&progress_with("ana", "1.2")).unwrap();

        let loaded = store.load("ana").unwrap().unwrap();
        assert_eq!(loaded.completed_lesson_ids.len(), 2);
        assert!(loaded.is_completed("1.1".parse().unwrap()));
        assert!(loaded.is_completed("1.2".parse().unwrap()));
        // no temp or lock files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn concurrent_writers_keep_every_completion() {
        let dir = tempfile::tempdir().unwrap();
        let lessons: Vec<String> = (1..=8).map(|i| format!("1.{i}")).collect();

        thread::scope(|s| {
            for lesson in &lessons {
                let store = JsonFileStore::new(dir.path());
                s.spawn(move || store.save(&progress_with("ana", lesson)).unwrap());
            }
        });

        let loaded = JsonFileStore::new(dir.path()).load("ana").unwrap().unwrap();
        assert_eq!(loaded.completed_lesson_ids.len(), lessons.len());
    }

    #[test]
    fn held_lock_times_out_and_stale_lock_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let lock = store.lock_path("ana");

        std::fs::write(&lock, "").unwrap();
        let old = SystemTime::now() - LOCK_STALE_AFTER - Duration::from_secs(5);
        std::fs::File::options()
            .write(true)
            .open(&lock)
            .unwrap()
            .set_modified(old)
            .unwrap();
        store.save(&progress_with("ana", "1.1")).unwrap();
        assert!(!lock.exists());

        let _held = LockFile::acquire(lock.clone()).unwrap();
        let err = LockFile::acquire(lock).unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));
    }

    #[test]
    fn lists_learners_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save(&LearnerProgress::new("zoe")).unwrap();
        store.save(&LearnerProgress::new("ana")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(store.list_learners().unwrap(), vec!["ana", "zoe"]);
    }

    #[test]
    fn rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.save(&LearnerProgress::new("../escape")).unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
        assert!(store.load("a/b").is_err());
    }

    #[test]
    fn corrupt_and_mismatched_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        std::fs::write(dir.path().join("ana.json"), "{ nope").unwrap();
        let err = store.load("ana").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Corrupt { .. })
        ));

        let other = serde_json::to_string(&LearnerProgress::new("bo")).unwrap();
        std::fs::write(dir.path().join("ana.json"), other).unwrap();
        let err = store.load("ana").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::LearnerMismatch { .. })
        ));
    }
}
