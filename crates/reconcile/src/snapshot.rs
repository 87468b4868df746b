//! Point-in-time view of a remote table.
//!
//! All translation between positions in the fetched value grid and the remote store's
//! 1-based, header-shifted row numbers happens here and nowhere else.

use std::{
	collections::{hash_map::Entry, HashMap},
	fmt,
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
	adapter::RemoteStore,
	error::{DatasetError, SnapshotError},
	executor::Executor,
	schema::ManagedSchema,
};

/// A 1-based row number in the remote table. Row 1 is the header, so data starts at 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowNumber(u32);

impl RowNumber {
	pub const HEADER: Self = Self(1);
	pub const FIRST_DATA: Self = Self(2);

	#[must_use]
	pub const fn get(self) -> u32 {
		self.0
	}

	#[allow(clippy::cast_possible_truncation)]
	const fn from_data_index(idx: usize) -> Self {
		Self(idx as u32 + Self::FIRST_DATA.0)
	}

	const fn data_index(self) -> Option<usize> {
		match self.0.checked_sub(Self::FIRST_DATA.0) {
			Some(idx) => Some(idx as usize),
			None => None,
		}
	}
}

impl fmt::Display for RowNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
	header: Vec<String>,
	rows: Vec<Vec<String>>,
	columns: HashMap<String, usize>,
	index: HashMap<String, RowNumber>,
	shadowed: usize,
}

impl RemoteSnapshot {
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	/// Builds a snapshot from the raw value grid returned by the remote store, header
	/// first.
	///
	/// Rows are padded or cut to the header width. Only rows with a non-blank identity
	/// are indexed; if the same identity shows up twice the upper row wins.
	pub fn from_values(
		mut values: Vec<Vec<String>>,
		identity_field: &str,
	) -> Result<Self, SnapshotError> {
		if values.is_empty() {
			return Ok(Self::empty());
		}

		let header = values.remove(0);
		let mut rows = values;

		let mut columns = HashMap::with_capacity(header.len());
		let mut repeated = Vec::new();
		for (idx, name) in header.iter().enumerate() {
			let name = name.trim();
			if name.is_empty() {
				continue;
			}
			if columns.insert(name.to_string(), idx).is_some() && !repeated.iter().any(|r| r == name) {
				repeated.push(name.to_string());
			}
		}
		if !repeated.is_empty() {
			return Err(SnapshotError::CorruptHeader(repeated));
		}

		for row in &mut rows {
			row.resize(header.len(), String::new());
		}

		let mut index = HashMap::with_capacity(rows.len());
		let mut shadowed = 0;
		if let Some(&col) = columns.get(identity_field) {
			for (idx, row) in rows.iter().enumerate() {
				let identity = row[col].trim();
				if identity.is_empty() {
					continue;
				}
				match index.entry(identity.to_string()) {
					Entry::Vacant(entry) => {
						entry.insert(RowNumber::from_data_index(idx));
					}
					Entry::Occupied(_) => shadowed += 1,
				}
			}
		}

		Ok(Self {
			header,
			rows,
			columns,
			index,
			shadowed,
		})
	}

	/// Checks that the managed region's header carries the schema fields in order.
	/// An empty snapshot has no header yet and always passes; a blank header above data
	/// rows does not.
	pub fn verify_managed_header(&self, schema: &ManagedSchema) -> Result<(), SnapshotError> {
		if self.is_empty() {
			return Ok(());
		}

		for (idx, expected) in schema.fields().iter().enumerate() {
			let found = self.header.get(idx).map_or("", |name| name.trim());
			if found != expected {
				return Err(SnapshotError::HeaderMismatch {
					column: idx + 1,
					expected: expected.clone(),
					found: found.to_string(),
				});
			}
		}

		Ok(())
	}

	/// No header and no rows: the remote table has never been written.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.header.is_empty() && self.rows.is_empty()
	}

	#[must_use]
	pub fn header(&self) -> &[String] {
		&self.header
	}

	#[must_use]
	pub fn row_count(&self) -> usize {
		self.rows.len()
	}

	#[must_use]
	pub fn indexed(&self) -> usize {
		self.index.len()
	}

	/// Rows hidden behind an earlier row with the same identity.
	#[must_use]
	pub const fn shadowed(&self) -> usize {
		self.shadowed
	}

	#[must_use]
	pub fn lookup(&self, identity: &str) -> Option<RowNumber> {
		self.index.get(identity.trim()).copied()
	}

	#[must_use]
	pub fn row(&self, row: RowNumber) -> Option<&[String]> {
		row.data_index()
			.and_then(|idx| self.rows.get(idx))
			.map(Vec::as_slice)
	}

	/// Cell of `row` under the column named `field`; `None` when either doesn't exist.
	#[must_use]
	pub fn value(&self, row: RowNumber, field: &str) -> Option<&str> {
		let col = *self.columns.get(field)?;
		self.row(row).map(|cells| cells[col].as_str())
	}
}

/// Fetches a dataset's remote table through the executor and indexes it.
pub async fn read_snapshot(
	store: &dyn RemoteStore,
	executor: &Executor,
	dataset: &str,
	schema: &ManagedSchema,
) -> Result<RemoteSnapshot, DatasetError> {
	let values = executor
		.execute(&format!("read '{dataset}'"), || store.read(dataset))
		.await?;

	let snapshot = RemoteSnapshot::from_values(values, schema.identity_field())?;

	if snapshot.is_empty() {
		info!(%dataset, "Remote table is empty");
	} else {
		debug!(
			%dataset,
			rows = snapshot.row_count(),
			indexed = snapshot.indexed(),
			"Read remote snapshot"
		);
	}

	if snapshot.shadowed() > 0 {
		warn!(
			%dataset,
			shadowed = snapshot.shadowed(),
			"Remote table holds repeated identities, only the first occurrence is matched"
		);
	}

	Ok(snapshot)
}
