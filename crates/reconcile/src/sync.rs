//! Per-dataset reconciliation pipeline and the run that drives it over every dataset.
//!
//! Within a dataset the steps are strictly sequential: normalize, read snapshot, diff,
//! plan, append, update. Datasets share nothing but the remote store handle and the
//! executor, so up to `concurrency` of them run at the same time. A failing dataset is
//! turned into an outcome at its own boundary and never stops the others.

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use futures::{stream, StreamExt};
use serde::{ser::SerializeStruct, Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
	adapter::{DatasetSpec, RemoteStore, SourceRows},
	config::SyncConfig,
	diff::diff,
	error::{ConfigurationError, DatasetError, ExecutorError},
	executor::Executor,
	normalize::{Normalizer, RawTable},
	plan::plan,
	schema::ManagedSchema,
	snapshot::read_snapshot,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeStatus {
	Synced,
	/// Writes were planned but not issued.
	DryRun,
	/// The source had nothing for this dataset.
	NoSourceData,
	/// Source or remote data can't be reconciled; nothing was written.
	Skipped { reason: String },
	Failed { error: String },
	Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutcome {
	pub appended: usize,
	pub updated: usize,
	pub unchanged: usize,
	pub status: OutcomeStatus,
}

impl DatasetOutcome {
	const fn new(status: OutcomeStatus) -> Self {
		Self {
			appended: 0,
			updated: 0,
			unchanged: 0,
			status,
		}
	}

	/// Nothing was attempted for this dataset.
	#[must_use]
	pub const fn skipped(&self) -> bool {
		matches!(
			self.status,
			OutcomeStatus::NoSourceData | OutcomeStatus::Skipped { .. }
		)
	}

	#[must_use]
	pub fn error(&self) -> Option<&str> {
		match &self.status {
			OutcomeStatus::Skipped { reason } => Some(reason),
			OutcomeStatus::Failed { error } => Some(error),
			_ => None,
		}
	}

	#[must_use]
	pub const fn is_failure(&self) -> bool {
		matches!(
			self.status,
			OutcomeStatus::Failed { .. } | OutcomeStatus::Cancelled
		)
	}
}

impl Serialize for DatasetOutcome {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("DatasetOutcome", 6)?;
		state.serialize_field("appended", &self.appended)?;
		state.serialize_field("updated", &self.updated)?;
		state.serialize_field("unchanged", &self.unchanged)?;
		state.serialize_field("skipped", &self.skipped())?;
		state.serialize_field("error", &self.error())?;
		state.serialize_field("status", &self.status)?;
		state.end()
	}
}

/// Outcome of every dataset in a run, keyed by remote table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SyncReport {
	pub datasets: BTreeMap<String, DatasetOutcome>,
}

impl SyncReport {
	#[must_use]
	pub fn has_failures(&self) -> bool {
		self.datasets.values().any(DatasetOutcome::is_failure)
	}

	#[must_use]
	pub fn get(&self, dataset: &str) -> Option<&DatasetOutcome> {
		self.datasets.get(dataset)
	}

	#[must_use]
	pub fn appended(&self) -> usize {
		self.datasets.values().map(|o| o.appended).sum()
	}

	#[must_use]
	pub fn updated(&self) -> usize {
		self.datasets.values().map(|o| o.updated).sum()
	}
}

pub struct Orchestrator {
	schema: Arc<ManagedSchema>,
	normalizer: Normalizer,
	store: Arc<dyn RemoteStore>,
	executor: Executor,
	concurrency: usize,
	dry_run: bool,
}

impl Orchestrator {
	/// Validates `config` once for the whole run.
	pub fn new(
		config: &SyncConfig,
		store: Arc<dyn RemoteStore>,
		cancel: CancellationToken,
	) -> Result<Self, ConfigurationError> {
		let schema = config.validate()?;

		Ok(Self {
			normalizer: Normalizer::new(Arc::clone(&schema), config),
			schema,
			store,
			executor: Executor::new(config.retry, cancel),
			concurrency: config.concurrency,
			dry_run: false,
		})
	}

	/// Plan and report, but never write.
	#[must_use]
	pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	#[must_use]
	pub fn schema(&self) -> &ManagedSchema {
		&self.schema
	}

	/// The executor remote calls go through. Shared with callers that need to make
	/// their own calls under the same policy and cancellation.
	#[must_use]
	pub const fn executor(&self) -> &Executor {
		&self.executor
	}

	/// Syncs every dataset once. A sheet claimed by more than one source key is skipped
	/// as a whole rather than written by two pipelines at once.
	pub async fn run(&self, source: &dyn SourceRows, datasets: &[DatasetSpec]) -> SyncReport {
		let (datasets, conflicting) = distinct_sheets(datasets);

		info!(
			datasets = datasets.len(),
			concurrency = self.concurrency,
			dry_run = self.dry_run,
			"Starting sync run"
		);

		let mut outcomes = stream::iter(datasets)
			.map(|dataset| {
				let span = info_span!("dataset", dataset = %dataset.sheet);
				async move {
					let outcome = self.fetch_and_sync(source, dataset).await;
					(dataset.sheet.clone(), outcome)
				}
				.instrument(span)
			})
			.buffer_unordered(self.concurrency)
			.collect::<BTreeMap<_, _>>()
			.await;

		for sheet in conflicting {
			error!(dataset = %sheet, "Sheet is the target of more than one dataset, skipping it");
			outcomes.insert(
				sheet,
				DatasetOutcome::new(OutcomeStatus::Skipped {
					reason: "sheet is the target of more than one dataset".to_string(),
				}),
			);
		}

		let report = SyncReport { datasets: outcomes };
		info!(
			appended = report.appended(),
			updated = report.updated(),
			failed = report.has_failures(),
			"Sync run finished"
		);

		report
	}

	async fn fetch_and_sync(&self, source: &dyn SourceRows, dataset: &DatasetSpec) -> DatasetOutcome {
		if self.executor.cancel_token().is_cancelled() {
			warn!(dataset = %dataset.sheet, "Run cancelled before dataset started");
			return DatasetOutcome::new(OutcomeStatus::Cancelled);
		}

		match source.rows(dataset).await {
			Ok(raw) => self.sync_dataset(&dataset.sheet, raw).await,
			Err(e) => {
				let e = DatasetError::from(e);
				error!(dataset = %dataset.sheet, %e, "Failed to load source rows");
				DatasetOutcome::new(OutcomeStatus::Failed {
					error: e.to_string(),
				})
			}
		}
	}

	/// Reconciles one remote table with the given source rows. Errors are turned into the
	/// returned outcome; counts reflect the writes that did go through.
	pub async fn sync_dataset(&self, dataset: &str, raw: Option<RawTable>) -> DatasetOutcome {
		let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
			info!(%dataset, "No source data, nothing to sync");
			return DatasetOutcome::new(OutcomeStatus::NoSourceData);
		};

		let mut outcome = DatasetOutcome::new(if self.dry_run {
			OutcomeStatus::DryRun
		} else {
			OutcomeStatus::Synced
		});

		if let Err(e) = self.pipeline(dataset, &raw, &mut outcome).await {
			outcome.status = match e {
				DatasetError::SchemaNotFound(_) => {
					warn!(%dataset, %e, "Skipping dataset");
					OutcomeStatus::Skipped {
						reason: e.to_string(),
					}
				}
				DatasetError::Snapshot(_) => {
					error!(%dataset, %e, "Skipping dataset, remote table is unusable");
					OutcomeStatus::Skipped {
						reason: e.to_string(),
					}
				}
				DatasetError::Remote(ExecutorError::Cancelled { .. }) => {
					warn!(%dataset, %e, "Dataset cancelled");
					OutcomeStatus::Cancelled
				}
				DatasetError::Remote(_) | DatasetError::Source(_) => {
					error!(%dataset, %e, "Dataset failed");
					OutcomeStatus::Failed {
						error: e.to_string(),
					}
				}
			};
		}

		outcome
	}

	async fn pipeline(
		&self,
		dataset: &str,
		raw: &RawTable,
		outcome: &mut DatasetOutcome,
	) -> Result<(), DatasetError> {
		let records = self.normalizer.normalize(raw)?;
		debug!(%dataset, records = records.len(), "Normalized source rows");

		let snapshot = read_snapshot(self.store.as_ref(), &self.executor, dataset, &self.schema).await?;
		snapshot.verify_managed_header(&self.schema)?;

		let change_set = diff(&records, &snapshot);
		outcome.unchanged = change_set.unchanged;

		let plan = plan(&change_set, &snapshot, &self.schema);

		if self.dry_run {
			outcome.appended = plan.append.len();
			outcome.updated = plan.updates.len();
			info!(
				%dataset,
				append = outcome.appended,
				update = outcome.updated,
				unchanged = outcome.unchanged,
				seed_header = plan.header.is_some(),
				"Dry run, skipping writes"
			);
			return Ok(());
		}

		if !plan.append.is_empty() {
			let batch = plan.append_batch();
			if plan.header.is_some() {
				info!(%dataset, "Seeding header on empty remote table");
			}
			self.executor
				.execute(&format!("append '{dataset}'"), || {
					self.store.append(dataset, &batch)
				})
				.await?;
			outcome.appended = plan.append.len();
		}

		if !plan.updates.is_empty() {
			self.executor
				.execute(&format!("update '{dataset}'"), || {
					self.store.batch_update(dataset, &plan.updates)
				})
				.await?;
			outcome.updated = plan.updates.len();
		}

		info!(
			%dataset,
			appended = outcome.appended,
			updated = outcome.updated,
			unchanged = outcome.unchanged,
			"Dataset synced"
		);

		Ok(())
	}
}

/// One entry per remote table. Exact repeats collapse into the first; sheets claimed by
/// different source keys are split off and returned by name.
fn distinct_sheets(datasets: &[DatasetSpec]) -> (Vec<&DatasetSpec>, BTreeSet<String>) {
	let mut distinct: Vec<&DatasetSpec> = Vec::with_capacity(datasets.len());
	let mut conflicting = BTreeSet::new();

	for dataset in datasets {
		match distinct.iter().find(|d| d.sheet == dataset.sheet).copied() {
			None => distinct.push(dataset),
			Some(first) if first.key == dataset.key => {
				warn!(dataset = %dataset.sheet, "Dataset listed more than once, syncing it once");
			}
			Some(_) => {
				conflicting.insert(dataset.sheet.clone());
			}
		}
	}

	distinct.retain(|dataset| !conflicting.contains(&dataset.sheet));
	(distinct, conflicting)
}
