//! Error types for loading the question repository, submitting answers and
//! talking to the bookmark store.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a usable question repository. Always terminal for the session.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read question data from {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("question data is not valid JSON: {0}")]
  Parse(#[from] serde_json::Error),

  /// Valid JSON, but not a question document.
  #[error("question data has an unexpected layout: {0}")]
  Layout(String),

  #[error("question data contains no questions")]
  Empty,

  #[error("duplicate question id {0}")]
  DuplicateId(u32),

  /// The record is present but its fields do not fit its declared type.
  #[error("question {id} is malformed: {reason}")]
  InvalidQuestion { id: u32, reason: String },
}

impl LoadError {
  pub(crate) fn invalid(id: u32, reason: impl Into<String>) -> Self {
    LoadError::InvalidQuestion { id, reason: reason.into() }
  }
}

/// Submission rejected before evaluation. No state is touched when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
  #[error("select at least one option")]
  NoSelection,

  #[error("answer all items ({answered} of {required} answered)")]
  Incomplete { answered: usize, required: usize },

  #[error("a {expected} question cannot take a {got} answer")]
  WrongShape { expected: &'static str, got: &'static str },

  #[error("there is no question to answer")]
  NoCurrentQuestion,
}

/// Bookmark persistence failures. Callers log these and keep going.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("bookmark store I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("bookmark store content is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),
}
