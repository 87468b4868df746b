use std::{fmt, io, path::Path};

use thiserror::Error;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<&'static str>,
}

impl fmt::Display for FileIOError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl FileIOError {
	pub fn new(path: impl AsRef<Path>, source: io::Error, context: &'static str) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}
}

impl From<(&Path, io::Error)> for FileIOError {
	fn from((path, source): (&Path, io::Error)) -> Self {
		Self {
			path: path.into(),
			source,
			maybe_context: None,
		}
	}
}

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("malformed row dump '{}': {source}", .path.display())]
	Dump {
		path: Box<Path>,
		#[source]
		source: serde_json::Error,
	},
}
