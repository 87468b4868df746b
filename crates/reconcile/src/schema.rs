use std::{collections::HashSet, fmt, sync::Arc};

use crate::error::ConfigurationError;

/// Ordered list of the fields the engine owns on the remote side.
///
/// The order doubles as the column order of the managed region, so column `i` of the
/// remote table always holds field `i`. Columns past [`ManagedSchema::len`] belong to the
/// remote store and are never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSchema {
	fields: Vec<String>,
	identity: usize,
}

impl ManagedSchema {
	pub fn new(
		fields: impl IntoIterator<Item = impl Into<String>>,
		identity_field: &str,
	) -> Result<Self, ConfigurationError> {
		let fields = fields.into_iter().map(Into::into).collect::<Vec<String>>();

		if fields.is_empty() {
			return Err(ConfigurationError::EmptySchema);
		}

		let mut seen = HashSet::with_capacity(fields.len());
		for field in &fields {
			if !seen.insert(field.as_str()) {
				return Err(ConfigurationError::DuplicateField(field.clone()));
			}
		}

		let identity = fields
			.iter()
			.position(|field| field == identity_field)
			.ok_or_else(|| ConfigurationError::MissingField {
				field: identity_field.to_string(),
				role: "identity",
			})?;

		Ok(Self { fields, identity })
	}

	#[must_use]
	pub fn fields(&self) -> &[String] {
		&self.fields
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	#[must_use]
	pub fn position(&self, field: &str) -> Option<usize> {
		self.fields.iter().position(|f| f == field)
	}

	#[must_use]
	pub fn identity_field(&self) -> &str {
		&self.fields[self.identity]
	}

	#[must_use]
	pub const fn identity_index(&self) -> usize {
		self.identity
	}
}

/// One fully shaped row: exactly one value per managed field, in schema order.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
	schema: Arc<ManagedSchema>,
	values: Vec<String>,
}

impl Record {
	/// Builds a record from values already laid out in schema order.
	///
	/// Short inputs are padded with empty strings and long ones truncated, so the field
	/// set always equals the schema.
	#[must_use]
	pub fn from_values(schema: Arc<ManagedSchema>, mut values: Vec<String>) -> Self {
		values.resize(schema.len(), String::new());
		Self { schema, values }
	}

	#[must_use]
	pub fn schema(&self) -> &ManagedSchema {
		&self.schema
	}

	#[must_use]
	pub fn get(&self, field: &str) -> Option<&str> {
		self.schema
			.position(field)
			.map(|idx| self.values[idx].as_str())
	}

	#[must_use]
	pub fn identity(&self) -> &str {
		&self.values[self.schema.identity_index()]
	}

	pub(crate) fn set_identity(&mut self, identity: String) {
		let idx = self.schema.identity_index();
		self.values[idx] = identity;
	}

	#[must_use]
	pub fn values(&self) -> &[String] {
		&self.values
	}

	#[must_use]
	pub fn into_values(self) -> Vec<String> {
		self.values
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.schema
			.fields()
			.iter()
			.map(String::as_str)
			.zip(self.values.iter().map(String::as_str))
	}
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}
