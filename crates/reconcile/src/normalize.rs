use std::{
	collections::{BTreeMap, HashSet},
	sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
	config::{IdentityFields, SyncConfig},
	error::NormalizeError,
	identity::{derive_identity, format_day_first, IdentityParts},
	schema::{ManagedSchema, Record},
};

/// Rows exactly as the source collaborator produced them.
///
/// `columns` is whatever the parser took for a header; the real header may just as well
/// sit in one of the first `rows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
	#[serde(default)]
	pub columns: Vec<String>,
	#[serde(default)]
	pub rows: Vec<Vec<String>>,
}

impl RawTable {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

/// Strips accents and turns separators into underscores: `Função` → `Funcao`,
/// `CPF/Passaporte` → `CPF_Passaporte`.
#[must_use]
pub fn sanitize_column_name(name: &str) -> String {
	name.trim()
		.nfd()
		.filter(|c| !is_combining_mark(*c))
		.map(|c| match c {
			' ' | '-' | '.' | '/' => '_',
			c => c,
		})
		.collect()
}

/// Maps raw source tables onto the managed schema.
#[derive(Debug, Clone)]
pub struct Normalizer {
	schema: Arc<ManagedSchema>,
	identity: IdentityFields,
	aliases: BTreeMap<String, String>,
	anchor: String,
	search_rows: usize,
}

impl Normalizer {
	#[must_use]
	pub fn new(schema: Arc<ManagedSchema>, config: &SyncConfig) -> Self {
		Self {
			schema,
			identity: config.identity.clone(),
			aliases: config.column_aliases.clone(),
			anchor: config.header_anchor.clone(),
			search_rows: config.header_search_rows,
		}
	}

	/// Produces schema-shaped records with their identity filled in, deduplicated by
	/// identity (first occurrence wins). Rows lacking any identity input are dropped.
	pub fn normalize(&self, raw: &RawTable) -> Result<Vec<Record>, NormalizeError> {
		let (header, data) = self.locate_header(raw)?;
		let columns = self.map_columns(header);

		let missing = self
			.identity
			.required()
			.into_iter()
			.filter(|field| {
				self.schema
					.position(field)
					.map_or(true, |pos| columns[pos].is_none())
			})
			.map(ToString::to_string)
			.collect::<Vec<_>>();
		if !missing.is_empty() {
			return Err(NormalizeError::MissingColumns(missing));
		}

		let date_pos = self.schema.position(&self.identity.date);
		let mut seen = HashSet::with_capacity(data.len());
		let mut records = Vec::with_capacity(data.len());
		let (mut incomplete, mut duplicates) = (0usize, 0usize);

		for row in data {
			let values = columns
				.iter()
				.map(|col| {
					col.and_then(|idx| row.get(idx))
						.map(|cell| cell.trim().to_string())
						.unwrap_or_default()
				})
				.collect::<Vec<_>>();

			let mut record = Record::from_values(Arc::clone(&self.schema), values);

			if self
				.identity
				.required()
				.iter()
				.any(|field| record.get(field).map_or(true, str::is_empty))
			{
				incomplete += 1;
				continue;
			}

			if let Some(pos) = date_pos {
				let mut values = record.into_values();
				values[pos] = format_day_first(&values[pos]).unwrap_or_default();
				record = Record::from_values(Arc::clone(&self.schema), values);
			}

			let identity = derive_identity(IdentityParts::from_record(&record, &self.identity));
			if !seen.insert(identity.clone()) {
				duplicates += 1;
				continue;
			}

			record.set_identity(identity);
			records.push(record);
		}

		debug!(
			kept = records.len(),
			incomplete, duplicates, "Normalized source rows"
		);

		Ok(records)
	}

	fn locate_header<'t>(
		&self,
		raw: &'t RawTable,
	) -> Result<(&'t [String], &'t [Vec<String>]), NormalizeError> {
		let has_anchor = |row: &[String]| row.iter().any(|cell| cell.contains(&self.anchor));

		if has_anchor(&raw.columns) {
			return Ok((&raw.columns, &raw.rows));
		}

		raw.rows
			.iter()
			.take(self.search_rows)
			.position(|row| has_anchor(row))
			.map(|idx| (raw.rows[idx].as_slice(), &raw.rows[idx + 1..]))
			.ok_or_else(|| NormalizeError::HeaderNotFound {
				anchor: self.anchor.clone(),
				searched: self.search_rows,
			})
	}

	/// For every managed field, the source column feeding it. The identity field is never
	/// fed from the source.
	fn map_columns(&self, header: &[String]) -> Vec<Option<usize>> {
		let mut columns = vec![None; self.schema.len()];

		for (idx, name) in header.iter().enumerate() {
			let sanitized = sanitize_column_name(name);
			let canonical = self
				.aliases
				.get(&sanitized)
				.map(String::as_str)
				.or_else(|| self.schema.position(name.trim()).map(|_| name.trim()));

			let Some(pos) = canonical.and_then(|field| self.schema.position(field)) else {
				continue;
			};

			if pos != self.schema.identity_index() && columns[pos].is_none() {
				columns[pos] = Some(idx);
			}
		}

		columns
	}
}
