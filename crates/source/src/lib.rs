//! Source rows read from a directory of pre-extracted report dumps.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ss_reconcile::{DatasetSpec, RawTable, SourceError, SourceRows};
use tokio::fs;
use tracing::{debug, info, warn};

mod discover;
mod dump;
mod error;

pub use discover::{find_file, significant_words};
pub use error::{Error, FileIOError};

const DUMP_EXTENSION: &str = "json";

/// Looks up each dataset's dump in `dir` by file name. A dataset without a matching
/// file simply has no data this run.
#[derive(Debug, Clone)]
pub struct DirectorySource {
	dir: PathBuf,
}

impl DirectorySource {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	#[must_use]
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Dump file names in the directory, sorted.
	async fn dump_names(&self) -> Result<Vec<String>, Error> {
		let mut entries = fs::read_dir(&self.dir)
			.await
			.map_err(|e| FileIOError::new(&self.dir, e, "Failed to read source directory"))?;

		let mut names = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| FileIOError::new(&self.dir, e, "Failed to read source directory entry"))?
		{
			let path = entry.path();
			let is_file = entry
				.file_type()
				.await
				.map_err(|e| FileIOError::from((path.as_path(), e)))?
				.is_file();

			if !is_file
				|| path
					.extension()
					.map_or(true, |ext| !ext.eq_ignore_ascii_case(DUMP_EXTENSION))
			{
				continue;
			}

			match entry.file_name().into_string() {
				Ok(name) => names.push(name),
				Err(name) => warn!(?name, "Ignoring dump with a non UTF-8 file name"),
			}
		}

		names.sort();
		Ok(names)
	}

	pub async fn load(&self, dataset: &DatasetSpec) -> Result<Option<RawTable>, Error> {
		let names = self.dump_names().await?;
		if names.is_empty() {
			warn!(dir = %self.dir.display(), "Source directory holds no dumps");
			return Ok(None);
		}

		let Some(name) = find_file(&names, &dataset.key, &dataset.sheet) else {
			warn!(key = %dataset.key, sheet = %dataset.sheet, "No source file for dataset");
			return Ok(None);
		};

		let path = self.dir.join(name);
		info!(sheet = %dataset.sheet, path = %path.display(), "Found source file");

		let bytes = fs::read(&path)
			.await
			.map_err(|e| FileIOError::new(&path, e, "Failed to read dump"))?;

		let table = dump::parse(&bytes).map_err(|source| Error::Dump {
			path: path.into_boxed_path(),
			source,
		})?;
		debug!(sheet = %dataset.sheet, rows = table.rows.len(), "Parsed dump");

		Ok(Some(table))
	}
}

#[async_trait]
impl SourceRows for DirectorySource {
	async fn rows(&self, dataset: &DatasetSpec) -> Result<Option<RawTable>, SourceError> {
		self.load(dataset)
			.await
			.map_err(|e| SourceError::new(&dataset.key, e))
	}
}
