use std::{error::Error as StdError, time::Duration};

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Setup defects. These abort the whole run instead of a single dataset.
#[derive(Debug, Error)]
pub enum ConfigurationError {
	#[error("managed schema is empty")]
	EmptySchema,
	#[error("managed schema lists field '{0}' more than once")]
	DuplicateField(String),
	#[error("required field '{field}' ({role}) is not part of the managed schema")]
	MissingField { field: String, role: &'static str },
	#[error("retry policy must allow at least one attempt")]
	ZeroAttempts,
	#[error("concurrency must be at least 1")]
	ZeroConcurrency,
	#[error("{0}")]
	Invalid(String),
}

/// Source data could not be mapped onto the managed schema.
#[derive(Debug, Error)]
pub enum NormalizeError {
	#[error("no header row containing '{anchor}' within the first {searched} rows")]
	HeaderNotFound { anchor: String, searched: usize },
	#[error("source header lacks required column(s): {}", .0.join(", "))]
	MissingColumns(Vec<String>),
}

/// The remote table can't be used as a basis for diffing.
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("remote header repeats column name(s): {}", .0.join(", "))]
	CorruptHeader(Vec<String>),
	#[error("remote header column {column} is '{found}', expected '{expected}'")]
	HeaderMismatch {
		column: usize,
		expected: String,
		found: String,
	},
}

/// Failure reported by a remote store adapter for a single call.
#[derive(Debug, Error)]
pub enum RemoteError {
	#[error("transient remote failure: {0}")]
	Transient(#[source] BoxError),
	#[error("remote rejected the request: {0}")]
	Permanent(#[source] BoxError),
	#[error("remote call timed out after {0:?}")]
	TimedOut(Duration),
}

impl RemoteError {
	pub fn transient(e: impl Into<BoxError>) -> Self {
		Self::Transient(e.into())
	}

	pub fn permanent(e: impl Into<BoxError>) -> Self {
		Self::Permanent(e.into())
	}

	/// Whether another attempt may succeed.
	#[must_use]
	pub const fn is_transient(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::TimedOut(_))
	}
}

#[derive(Debug, Error)]
pub enum ExecutorError {
	#[error("{operation} failed after {attempts} attempt(s): {source}")]
	TerminalFailure {
		operation: String,
		attempts: u32,
		#[source]
		source: RemoteError,
	},
	#[error("{operation} cancelled after {attempts} attempt(s)")]
	Cancelled { operation: String, attempts: u32 },
}

#[derive(Debug, Error)]
#[error("failed to load source rows for '{dataset}': {source}")]
pub struct SourceError {
	pub dataset: String,
	#[source]
	pub source: BoxError,
}

impl SourceError {
	pub fn new(dataset: impl Into<String>, source: impl Into<BoxError>) -> Self {
		Self {
			dataset: dataset.into(),
			source: source.into(),
		}
	}
}

/// Everything that can stop a single dataset pass. Never fatal for the run.
#[derive(Debug, Error)]
pub enum DatasetError {
	#[error("schema not found: {0}")]
	SchemaNotFound(#[from] NormalizeError),
	#[error(transparent)]
	Snapshot(#[from] SnapshotError),
	#[error(transparent)]
	Remote(#[from] ExecutorError),
	#[error(transparent)]
	Source(#[from] SourceError),
}

impl DatasetError {
	#[must_use]
	pub const fn is_cancelled(&self) -> bool {
		matches!(self, Self::Remote(ExecutorError::Cancelled { .. }))
	}
}
