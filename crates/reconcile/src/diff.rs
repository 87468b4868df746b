use tracing::debug;

use crate::{
	schema::Record,
	snapshot::{RemoteSnapshot, RowNumber},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
	New,
	Changed(RowNumber),
	Unchanged(RowNumber),
}

/// Result of diffing one pass. Unchanged records are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
	pub to_append: Vec<Record>,
	pub to_update: Vec<(RowNumber, Record)>,
	pub unchanged: usize,
}

impl ChangeSet {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.to_append.is_empty() && self.to_update.is_empty()
	}
}

/// Classifies a record against the snapshot.
///
/// Managed fields are compared as trimmed strings and nothing else: no numeric or date
/// awareness, and columns outside the schema are never looked at.
#[must_use]
pub fn classify(record: &Record, snapshot: &RemoteSnapshot) -> Classification {
	let Some(row) = snapshot.lookup(record.identity()) else {
		return Classification::New;
	};

	let differs = record
		.iter()
		.any(|(field, value)| snapshot.value(row, field).unwrap_or_default().trim() != value.trim());

	if differs {
		Classification::Changed(row)
	} else {
		Classification::Unchanged(row)
	}
}

#[must_use]
pub fn diff(records: &[Record], snapshot: &RemoteSnapshot) -> ChangeSet {
	let mut change_set = ChangeSet::default();

	for record in records {
		match classify(record, snapshot) {
			Classification::New => change_set.to_append.push(record.clone()),
			Classification::Changed(row) => change_set.to_update.push((row, record.clone())),
			Classification::Unchanged(_) => change_set.unchanged += 1,
		}
	}

	debug!(
		new = change_set.to_append.len(),
		changed = change_set.to_update.len(),
		unchanged = change_set.unchanged,
		"Diffed records against snapshot"
	);

	change_set
}
