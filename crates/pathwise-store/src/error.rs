//! Store error types.

use thiserror::Error;

/// Errors that can occur when persisting learner progress.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The learner ID cannot be used as a storage key.
    #[error("invalid learner ID '{0}': must be non-empty and contain no path separators or '..'")]
    InvalidLearnerId(String),

    /// Reading or writing the backing storage failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Another writer held the learner's lock file for too long.
    #[error("timed out waiting for lock {path}")]
    Locked { path: String },

    /// A stored snapshot could not be decoded.
    #[error("corrupt progress file {path}: {message}")]
    Corrupt { path: String, message: String },

    /// A stored snapshot belongs to a different learner than its key.
    #[error("progress file {path} belongs to learner '{found}', expected '{expected}'")]
    LearnerMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

/// Reject learner IDs that would escape or collide in a directory store.
pub fn validate_learner_id(learner_id: &str) -> Result<(), StoreError> {
    let bad = learner_id.trim().is_empty()
        || learner_id.contains(['/', '\\'])
        || learner_id.contains("..")
        || learner_id.contains('\0');
    if bad {
        return Err(StoreError::InvalidLearnerId(learner_id.to_string()));
    }
    Ok(())
}
