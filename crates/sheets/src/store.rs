use async_trait::async_trait;
use ss_reconcile::{RemoteError, RemoteStore, RowUpdate};
use tracing::{debug, info};

use crate::{
	a1::{anchor_range, row_range, sheet_range},
	client::SheetsClient,
};

/// Each dataset is a sheet (tab) of one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsStore {
	client: SheetsClient,
}

impl SheetsStore {
	#[must_use]
	pub const fn new(client: SheetsClient) -> Self {
		Self { client }
	}

	#[must_use]
	pub const fn client(&self) -> &SheetsClient {
		&self.client
	}

	/// Writes a single text value to `range`, e.g. a "last run" cell.
	pub async fn write_cell(&self, range: &str, text: &str) -> Result<(), RemoteError> {
		self.client
			.update_values(range, &[vec![text.to_string()]])
			.await?;
		debug!(%range, "Wrote cell");
		Ok(())
	}
}

#[async_trait]
impl RemoteStore for SheetsStore {
	async fn read(&self, dataset: &str) -> Result<Vec<Vec<String>>, RemoteError> {
		let values = self.client.get_values(&sheet_range(dataset)).await?;
		debug!(%dataset, rows = values.len(), "Fetched sheet values");
		Ok(values)
	}

	async fn append(&self, dataset: &str, rows: &[Vec<String>]) -> Result<(), RemoteError> {
		if rows.is_empty() {
			return Ok(());
		}

		self.client
			.append_values(&anchor_range(dataset), rows)
			.await?;
		info!(%dataset, rows = rows.len(), "Appended rows to sheet");
		Ok(())
	}

	async fn batch_update(&self, dataset: &str, updates: &[RowUpdate]) -> Result<(), RemoteError> {
		if updates.is_empty() {
			return Ok(());
		}

		let data = updates
			.iter()
			.map(|update| {
				(
					row_range(dataset, update.row.get(), update.values.len()),
					update.values.as_slice(),
				)
			})
			.collect::<Vec<_>>();

		self.client.batch_update_values(&data).await?;
		info!(%dataset, rows = updates.len(), "Updated sheet rows");
		Ok(())
	}
}
