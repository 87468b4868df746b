//! Deterministic record identity.
//!
//! An identity is `<document>-<DD/MM/YYYY>-<first 3 chars of request type>`. It is computed
//! the same way when normalizing source rows and when reading it back from the remote
//! table, so both sides can be matched by plain string equality.

use chrono::NaiveDate;

use crate::{config::IdentityFields, schema::Record};

pub const SEPARATOR: char = '-';
pub const TYPE_PREFIX_LEN: usize = 3;
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityParts<'a> {
	pub document: &'a str,
	pub date: &'a str,
	pub request_type: &'a str,
}

impl<'a> IdentityParts<'a> {
	/// Reads the business fields out of a record. Absent fields count as empty.
	#[must_use]
	pub fn from_record(record: &'a Record, fields: &IdentityFields) -> Self {
		Self {
			document: record.get(&fields.document).unwrap_or_default(),
			date: record.get(&fields.date).unwrap_or_default(),
			request_type: record.get(&fields.request_type).unwrap_or_default(),
		}
	}
}

/// Builds the identity key. Never fails: an unparseable date becomes an empty segment,
/// and a blank document still yields a (possibly shared) key.
#[must_use]
pub fn derive_identity(parts: IdentityParts<'_>) -> String {
	let document = parts.document.trim();
	let date = format_day_first(parts.date).unwrap_or_default();
	let type_prefix = parts
		.request_type
		.trim()
		.chars()
		.take(TYPE_PREFIX_LEN)
		.collect::<String>();

	format!("{document}{SEPARATOR}{date}{SEPARATOR}{type_prefix}")
}

/// Re-emits a day-first date as `DD/MM/YYYY`.
#[must_use]
pub fn format_day_first(raw: &str) -> Option<String> {
	parse_day_first(raw).map(|date| date.format(DATE_FORMAT).to_string())
}

/// Parses `D/M/Y`, `D-M-Y` or `D.M.Y` (2 or 4 digit years) and ISO `Y-M-D`, ignoring any
/// trailing time of day. A reading that is impossible day-first but valid month-first
/// (`03/25/2024`) is accepted month-first.
#[must_use]
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
	let date_part = raw
		.trim()
		.split(|c: char| c.is_whitespace() || c == 'T')
		.next()?;

	let mut parts = date_part.split(['/', '-', '.']);
	let (first, second, third) = (parts.next()?, parts.next()?, parts.next()?);
	if parts.next().is_some() {
		return None;
	}

	if ![first, second, third]
		.iter()
		.all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
	{
		return None;
	}

	if first.len() == 4 {
		return NaiveDate::from_ymd_opt(first.parse().ok()?, second.parse().ok()?, third.parse().ok()?);
	}

	if first.len() > 2 || second.len() > 2 {
		return None;
	}

	let year = expand_year(third)?;
	let (first, second) = (first.parse().ok()?, second.parse().ok()?);

	NaiveDate::from_ymd_opt(year, second, first).or_else(|| NaiveDate::from_ymd_opt(year, first, second))
}

fn expand_year(raw: &str) -> Option<i32> {
	let year = raw.parse::<i32>().ok()?;
	match raw.len() {
		4 => Some(year),
		2 if year < 69 => Some(2000 + year),
		2 => Some(1900 + year),
		_ => None,
	}
}
