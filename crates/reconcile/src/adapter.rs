use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
	error::{RemoteError, SourceError},
	normalize::RawTable,
	plan::RowUpdate,
};

/// One source-to-remote-table pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetSpec {
	/// Identifies the source data (e.g. a keyword in the report file name).
	pub key: String,
	/// Remote table (sheet/tab) the rows are reconciled against.
	pub sheet: String,
}

impl DatasetSpec {
	pub fn new(key: impl Into<String>, sheet: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			sheet: sheet.into(),
		}
	}
}

/// Where current extracted rows come from.
#[async_trait]
pub trait SourceRows: Send + Sync {
	/// `Ok(None)` means there is nothing to sync for this dataset right now.
	async fn rows(&self, dataset: &DatasetSpec) -> Result<Option<RawTable>, SourceError>;
}

/// The remote tabular store.
///
/// Implementations must make `append` land strictly after existing content and must
/// confine each `batch_update` write to the given row and the width of its values.
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Whole table as a grid of cells, header row first. Empty when nothing was ever
	/// written.
	async fn read(&self, dataset: &str) -> Result<Vec<Vec<String>>, RemoteError>;

	async fn append(&self, dataset: &str, rows: &[Vec<String>]) -> Result<(), RemoteError>;

	async fn batch_update(&self, dataset: &str, updates: &[RowUpdate]) -> Result<(), RemoteError>;
}
