use ss_reconcile::{
	DatasetSpec, Orchestrator, OutcomeStatus, RetryPolicy, SyncConfig, DEFAULT_SCHEMA,
};

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

mod common;

use common::{grid, permanent, transient, MemoryStore, Op, StaticSource, SOURCE_COLUMNS};

const MARIA: [&str; 6] = [
	"Maria",
	"12345678900",
	"Soldadora",
	"05-03-2024",
	"Admissional",
	"Pendente",
];
const MARIA_ID: &str = "12345678900-05/03/2024-Adm";

fn config() -> SyncConfig {
	SyncConfig {
		retry: RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(10),
			max_jitter: Duration::ZERO,
			attempt_timeout: None,
		},
		..SyncConfig::default()
	}
}

fn orchestrator(store: &Arc<MemoryStore>) -> Orchestrator {
	Orchestrator::new(&config(), Arc::clone(store) as _, CancellationToken::new()).unwrap()
}

fn header(extra: &[&str]) -> Vec<String> {
	DEFAULT_SCHEMA
		.iter()
		.chain(extra)
		.map(ToString::to_string)
		.collect()
}

/// A remote row in managed-schema order from `(field, value)` pairs, plus trailing
/// store-owned cells.
fn remote_row(fields: &[(&str, &str)], extra: &[&str]) -> Vec<String> {
	let mut row = vec![String::new(); DEFAULT_SCHEMA.len()];
	for (field, value) in fields {
		let idx = DEFAULT_SCHEMA.iter().position(|f| f == field).unwrap();
		row[idx] = (*value).to_string();
	}
	row.extend(extra.iter().map(ToString::to_string));
	row
}

fn maria_remote(status: &str) -> Vec<String> {
	remote_row(
		&[
			("ID_Unico", MARIA_ID),
			("Paciente", "Maria"),
			("CPF/Passaporte", "12345678900"),
			("Função", "Soldadora"),
			("Previsto Para", "05/03/2024"),
			("Tipo de Pedido", "Admissional"),
			("Status Expedição - BR MED", status),
		],
		&["=HOJE()-J2"],
	)
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn new_records_round_trip_to_unchanged() {
	let store = Arc::new(MemoryStore::default());
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA]);
	let datasets = [DatasetSpec::new("alpha", "Alpha")];
	let orchestrator = orchestrator(&store);

	let first = orchestrator.run(&source, &datasets).await;
	let outcome = first.get("Alpha").unwrap();
	assert_eq!(outcome.status, OutcomeStatus::Synced);
	assert_eq!(outcome.appended, 1);

	let table = store.table("Alpha");
	assert_eq!(table[0], header(&[]));
	assert_eq!(table[1][0], MARIA_ID);
	assert!(logs_contain("Seeding header on empty remote table"));

	let second = orchestrator.run(&source, &datasets).await;
	let outcome = second.get("Alpha").unwrap();
	assert_eq!((outcome.appended, outcome.updated, outcome.unchanged), (0, 0, 1));
	assert_eq!(store.calls("Alpha", Op::Append), 1);
	assert_eq!(store.table("Alpha").len(), 2);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn changed_record_is_rewritten_within_managed_span() {
	let store = Arc::new(MemoryStore::default().with_table(
		"Alpha",
		vec![header(&["Dias em atraso"]), maria_remote("Liberado")],
	));
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA]);

	let report = orchestrator(&store)
		.run(&source, &[DatasetSpec::new("alpha", "Alpha")])
		.await;

	let outcome = report.get("Alpha").unwrap();
	assert_eq!((outcome.appended, outcome.updated), (0, 1));
	assert_eq!(store.calls("Alpha", Op::Append), 0);
	assert_eq!(store.table("Alpha")[1], maria_remote("Pendente"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn store_owned_columns_never_cause_updates() {
	let store = Arc::new(MemoryStore::default().with_table(
		"Alpha",
		vec![header(&["Dias em atraso"]), maria_remote("Pendente")],
	));
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA]);

	let report = orchestrator(&store)
		.run(&source, &[DatasetSpec::new("alpha", "Alpha")])
		.await;

	assert_eq!(report.get("Alpha").unwrap().unchanged, 1);
	assert_eq!(store.calls("Alpha", Op::Update), 0);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn broken_dataset_does_not_stop_the_others() {
	let store = Arc::new(
		MemoryStore::default()
			.with_table("Corrupt", grid(&[&["ID_Unico", "Paciente", "Paciente"]]))
			.with_table("Swapped", grid(&[&["Paciente", "ID_Unico"]])),
	);
	store.fail("Failing", Op::Append, permanent());

	let source = StaticSource::default()
		.with("good", &SOURCE_COLUMNS, &[&MARIA])
		.with("corrupt", &SOURCE_COLUMNS, &[&MARIA])
		.with("swapped", &SOURCE_COLUMNS, &[&MARIA])
		.with("failing", &SOURCE_COLUMNS, &[&MARIA])
		.with("headless", &[], &[&["sem", "cabeçalho"]])
		.broken("unreadable", "permission denied");

	let report = orchestrator(&store)
		.run(
			&source,
			&[
				DatasetSpec::new("good", "Good"),
				DatasetSpec::new("corrupt", "Corrupt"),
				DatasetSpec::new("swapped", "Swapped"),
				DatasetSpec::new("failing", "Failing"),
				DatasetSpec::new("headless", "Headless"),
				DatasetSpec::new("unreadable", "Unreadable"),
				DatasetSpec::new("missing", "Missing"),
			],
		)
		.await;

	assert_eq!(report.datasets.len(), 7);
	assert_eq!(report.get("Good").unwrap().status, OutcomeStatus::Synced);
	assert_eq!(report.get("Good").unwrap().appended, 1);

	for skipped in ["Corrupt", "Swapped", "Headless"] {
		let outcome = report.get(skipped).unwrap();
		assert!(outcome.skipped(), "{skipped}: {outcome:?}");
		assert!(outcome.error().is_some());
	}
	assert!(report
		.get("Corrupt")
		.unwrap()
		.error()
		.unwrap()
		.contains("Paciente"));

	assert!(matches!(
		report.get("Failing").unwrap().status,
		OutcomeStatus::Failed { .. }
	));
	assert!(matches!(
		report.get("Unreadable").unwrap().status,
		OutcomeStatus::Failed { .. }
	));
	assert_eq!(
		report.get("Missing").unwrap().status,
		OutcomeStatus::NoSourceData
	);
	assert!(report.has_failures());

	// skipped datasets never get written to, and unusable source never reaches the store
	assert_eq!(store.calls("Corrupt", Op::Append), 0);
	assert_eq!(store.calls("Swapped", Op::Append), 0);
	assert_eq!(store.calls("Headless", Op::Read), 0);
	assert_eq!(store.calls("Failing", Op::Append), 1);

	assert!(logs_contain("Skipping dataset"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn blank_header_over_existing_rows_is_skipped() {
	let store = Arc::new(MemoryStore::default().with_table(
		"Alpha",
		vec![Vec::new(), maria_remote("Liberado")],
	));
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA]);

	let report = orchestrator(&store)
		.run(&source, &[DatasetSpec::new("alpha", "Alpha")])
		.await;

	let outcome = report.get("Alpha").unwrap();
	assert!(outcome.skipped(), "{outcome:?}");
	assert!(outcome.error().unwrap().contains("ID_Unico"));
	assert_eq!(store.calls("Alpha", Op::Append), 0);
	assert_eq!(store.calls("Alpha", Op::Update), 0);
	assert_eq!(store.table("Alpha").len(), 2);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn transient_write_failures_are_retried() {
	let store = Arc::new(MemoryStore::default());
	store.fail("Alpha", Op::Read, transient());
	store.fail("Alpha", Op::Append, transient());
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA]);

	let report = orchestrator(&store)
		.run(&source, &[DatasetSpec::new("alpha", "Alpha")])
		.await;

	assert_eq!(report.get("Alpha").unwrap().appended, 1);
	assert!(!report.has_failures());
	assert_eq!(store.calls("Alpha", Op::Read), 2);
	assert_eq!(store.calls("Alpha", Op::Append), 2);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn dry_run_plans_without_writing() {
	let store = Arc::new(MemoryStore::default().with_table(
		"Alpha",
		vec![header(&[]), maria_remote("Liberado")],
	));
	let joao = ["João", "98765432100", "Pintor", "01/04/2024", "Periódico", ""];
	let source = StaticSource::default().with("alpha", &SOURCE_COLUMNS, &[&MARIA, &joao]);

	let report = orchestrator(&store)
		.with_dry_run(true)
		.run(&source, &[DatasetSpec::new("alpha", "Alpha")])
		.await;

	let outcome = report.get("Alpha").unwrap();
	assert_eq!(outcome.status, OutcomeStatus::DryRun);
	assert_eq!((outcome.appended, outcome.updated), (1, 1));
	assert_eq!(store.calls("Alpha", Op::Append), 0);
	assert_eq!(store.calls("Alpha", Op::Update), 0);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn sheet_claimed_twice_is_never_written() {
	let store = Arc::new(MemoryStore::default());
	let source = StaticSource::default()
		.with("alpha", &SOURCE_COLUMNS, &[&MARIA])
		.with("beta", &SOURCE_COLUMNS, &[&MARIA])
		.with("gamma", &SOURCE_COLUMNS, &[&MARIA]);

	let report = orchestrator(&store)
		.run(
			&source,
			&[
				DatasetSpec::new("alpha", "Alpha"),
				DatasetSpec::new("alpha", "Alpha"),
				DatasetSpec::new("beta", "Shared"),
				DatasetSpec::new("gamma", "Shared"),
			],
		)
		.await;

	assert_eq!(report.datasets.len(), 2);
	assert_eq!(report.get("Alpha").unwrap().appended, 1);
	assert_eq!(store.calls("Alpha", Op::Append), 1);

	let shared = report.get("Shared").unwrap();
	assert!(shared.skipped(), "{shared:?}");
	assert!(shared.error().unwrap().contains("more than one dataset"));
	assert_eq!(store.calls("Shared", Op::Read), 0);
	assert_eq!(store.calls("Shared", Op::Append), 0);

	assert!(logs_contain("Dataset listed more than once"));
}

#[tokio::test]
#[traced_test]
async fn cancelled_run_reports_cancelled_datasets() {
	let store = Arc::new(MemoryStore::default());
	let cancel = CancellationToken::new();
	cancel.cancel();
	let source = StaticSource::default()
		.with("alpha", &SOURCE_COLUMNS, &[&MARIA])
		.with("beta", &SOURCE_COLUMNS, &[&MARIA]);

	let report = Orchestrator::new(&config(), Arc::clone(&store) as _, cancel)
		.unwrap()
		.run(
			&source,
			&[DatasetSpec::new("alpha", "Alpha"), DatasetSpec::new("beta", "Beta")],
		)
		.await;

	assert!(report
		.datasets
		.values()
		.all(|outcome| outcome.status == OutcomeStatus::Cancelled));
	assert!(report.has_failures());
	assert_eq!(store.calls("Alpha", Op::Read), 0);
}

#[tokio::test]
async fn invalid_configuration_is_fatal() {
	let mut config = config();
	config.schema.retain(|field| field != "Tipo de Pedido");

	assert!(Orchestrator::new(
		&config,
		Arc::new(MemoryStore::default()) as _,
		CancellationToken::new()
	)
	.is_err());
}
