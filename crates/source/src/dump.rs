//! Row dumps written by the report extractor.
//!
//! Either an object with optional `columns` and `rows`, or a bare array of rows. Cells
//! may be any JSON scalar.

use serde::Deserialize;
use serde_json::Value;
use ss_reconcile::RawTable;

#[derive(Deserialize)]
#[serde(untagged)]
enum Dump {
	// tried first, a struct variant would also accept a sequence
	Rows(Vec<Vec<Value>>),
	Table {
		#[serde(default)]
		columns: Vec<Value>,
		#[serde(default)]
		rows: Vec<Vec<Value>>,
	},
}

fn cell(value: Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s,
		other => other.to_string(),
	}
}

fn row(values: Vec<Value>) -> Vec<String> {
	values.into_iter().map(cell).collect()
}

pub fn parse(bytes: &[u8]) -> Result<RawTable, serde_json::Error> {
	Ok(match serde_json::from_slice(bytes)? {
		Dump::Rows(rows) => RawTable {
			columns: Vec::new(),
			rows: rows.into_iter().map(row).collect(),
		},
		Dump::Table { columns, rows } => RawTable {
			columns: row(columns),
			rows: rows.into_iter().map(row).collect(),
		},
	})
}
