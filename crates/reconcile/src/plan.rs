use serde::Serialize;

use crate::{
	diff::ChangeSet,
	schema::ManagedSchema,
	snapshot::{RemoteSnapshot, RowNumber},
};

/// Overwrite of the managed span of one existing remote row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowUpdate {
	pub row: RowNumber,
	/// Exactly one value per managed field. Adapters write these starting at the first
	/// column and stop after the last.
	pub values: Vec<String>,
}

/// Writes needed to bring one remote table in line with the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationPlan {
	/// Set when the remote table has never been written and rows are about to be
	/// appended to it.
	pub header: Option<Vec<String>>,
	pub append: Vec<Vec<String>>,
	pub updates: Vec<RowUpdate>,
}

impl MutationPlan {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.append.is_empty() && self.updates.is_empty()
	}

	/// Rows for a single append call, the seeded header first.
	#[must_use]
	pub fn append_batch(&self) -> Vec<Vec<String>> {
		self.header
			.iter()
			.chain(self.append.iter())
			.cloned()
			.collect()
	}
}

/// Turns a change set into write batches. Pure: no I/O, no clock, no randomness.
#[must_use]
pub fn plan(change_set: &ChangeSet, snapshot: &RemoteSnapshot, schema: &ManagedSchema) -> MutationPlan {
	let append = change_set
		.to_append
		.iter()
		.map(|record| record.values().to_vec())
		.collect::<Vec<_>>();

	let updates = change_set
		.to_update
		.iter()
		.map(|(row, record)| RowUpdate {
			row: *row,
			values: record.values().to_vec(),
		})
		.collect();

	let header = (snapshot.is_empty() && !append.is_empty()).then(|| schema.fields().to_vec());

	MutationPlan {
		header,
		append,
		updates,
	}
}
