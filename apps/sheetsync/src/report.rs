use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use ss_reconcile::{DatasetOutcome, ManagedSchema, OutcomeStatus, SyncReport};

fn status_label(outcome: &DatasetOutcome) -> &'static str {
	match outcome.status {
		OutcomeStatus::Synced => "synced",
		OutcomeStatus::DryRun => "dry run",
		OutcomeStatus::NoSourceData => "no data",
		OutcomeStatus::Skipped { .. } => "skipped",
		OutcomeStatus::Failed { .. } => "failed",
		OutcomeStatus::Cancelled => "cancelled",
	}
}

pub fn report_table(report: &SyncReport) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_BORDERS_ONLY);
	table.set_header(vec!["Sheet", "Status", "Appended", "Updated", "Unchanged", "Error"]);

	for (sheet, outcome) in &report.datasets {
		table.add_row(vec![
			sheet.clone(),
			status_label(outcome).to_string(),
			outcome.appended.to_string(),
			outcome.updated.to_string(),
			outcome.unchanged.to_string(),
			outcome.error().unwrap_or_default().to_string(),
		]);
	}

	table
}

pub fn schema_table(schema: &ManagedSchema) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_BORDERS_ONLY);
	table.set_header(vec!["Column", "Field"]);

	for (idx, field) in schema.fields().iter().enumerate() {
		let mut name = field.clone();
		if idx == schema.identity_index() {
			name.push_str(" (identity)");
		}
		table.add_row(vec![ss_sheets::a1::column_letters(idx + 1), name]);
	}

	table
}
