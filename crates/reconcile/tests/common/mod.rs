#![allow(dead_code, clippy::unwrap_used)]

use std::{
	collections::{HashMap, VecDeque},
	sync::Mutex,
};

use async_trait::async_trait;
use ss_reconcile::{DatasetSpec, RawTable, RemoteError, RemoteStore, RowUpdate, SourceError, SourceRows};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	Read,
	Append,
	Update,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub &'static str);

/// Remote tables kept in memory, with scripted failures per dataset and operation.
///
/// Appends land after the last row and updates only touch as many columns as they
/// carry values, like the real store.
#[derive(Default)]
pub struct MemoryStore {
	tables: Mutex<HashMap<String, Vec<Vec<String>>>>,
	failures: Mutex<HashMap<(String, Op), VecDeque<RemoteError>>>,
	calls: Mutex<Vec<(String, Op)>>,
}

impl MemoryStore {
	pub fn with_table(self, dataset: &str, rows: Vec<Vec<String>>) -> Self {
		self.tables.lock().unwrap().insert(dataset.to_string(), rows);
		self
	}

	pub fn fail(&self, dataset: &str, op: Op, error: RemoteError) {
		self.failures
			.lock()
			.unwrap()
			.entry((dataset.to_string(), op))
			.or_default()
			.push_back(error);
	}

	pub fn table(&self, dataset: &str) -> Vec<Vec<String>> {
		self.tables
			.lock()
			.unwrap()
			.get(dataset)
			.cloned()
			.unwrap_or_default()
	}

	pub fn calls(&self, dataset: &str, op: Op) -> usize {
		self.calls
			.lock()
			.unwrap()
			.iter()
			.filter(|(d, o)| d == dataset && *o == op)
			.count()
	}

	fn enter(&self, dataset: &str, op: Op) -> Result<(), RemoteError> {
		self.calls.lock().unwrap().push((dataset.to_string(), op));

		match self
			.failures
			.lock()
			.unwrap()
			.get_mut(&(dataset.to_string(), op))
			.and_then(VecDeque::pop_front)
		{
			Some(error) => Err(error),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl RemoteStore for MemoryStore {
	async fn read(&self, dataset: &str) -> Result<Vec<Vec<String>>, RemoteError> {
		self.enter(dataset, Op::Read)?;
		Ok(self.table(dataset))
	}

	async fn append(&self, dataset: &str, rows: &[Vec<String>]) -> Result<(), RemoteError> {
		self.enter(dataset, Op::Append)?;
		self.tables
			.lock()
			.unwrap()
			.entry(dataset.to_string())
			.or_default()
			.extend(rows.iter().cloned());
		Ok(())
	}

	async fn batch_update(&self, dataset: &str, updates: &[RowUpdate]) -> Result<(), RemoteError> {
		self.enter(dataset, Op::Update)?;
		let mut tables = self.tables.lock().unwrap();
		let table = tables.entry(dataset.to_string()).or_default();

		for update in updates {
			let idx = update.row.get() as usize - 1;
			if table.len() <= idx {
				table.resize(idx + 1, Vec::new());
			}
			let row = &mut table[idx];
			if row.len() < update.values.len() {
				row.resize(update.values.len(), String::new());
			}
			row[..update.values.len()].clone_from_slice(&update.values);
		}

		Ok(())
	}
}

/// Source rows handed out by dataset key.
#[derive(Default)]
pub struct StaticSource {
	tables: HashMap<String, Result<RawTable, &'static str>>,
}

impl StaticSource {
	pub fn with(mut self, key: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
		self.tables.insert(
			key.to_string(),
			Ok(RawTable {
				columns: columns.iter().map(ToString::to_string).collect(),
				rows: grid(rows),
			}),
		);
		self
	}

	pub fn broken(mut self, key: &str, reason: &'static str) -> Self {
		self.tables.insert(key.to_string(), Err(reason));
		self
	}
}

#[async_trait]
impl SourceRows for StaticSource {
	async fn rows(&self, dataset: &DatasetSpec) -> Result<Option<RawTable>, SourceError> {
		match self.tables.get(&dataset.key) {
			Some(Ok(table)) => Ok(Some(table.clone())),
			Some(Err(reason)) => Err(SourceError::new(&dataset.key, FakeError(*reason))),
			None => Ok(None),
		}
	}
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
	rows.iter()
		.map(|row| row.iter().map(ToString::to_string).collect())
		.collect()
}

pub fn transient() -> RemoteError {
	RemoteError::transient(FakeError("503 Service Unavailable"))
}

pub fn permanent() -> RemoteError {
	RemoteError::permanent(FakeError("403 Forbidden"))
}

pub const SOURCE_COLUMNS: [&str; 6] = [
	"Paciente",
	"CPF/Passaporte",
	"Função",
	"Previsto Para",
	"Tipo de Pedido",
	"Status Expedição - BR MED",
];
