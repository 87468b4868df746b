use std::{
	path::{Path, PathBuf},
	process::ExitCode,
	sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use ss_reconcile::{ManagedSchema, Orchestrator, SyncReport};
use ss_sheets::{RequestConfig, SheetsClient, SheetsStore};
use ss_source::DirectorySource;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod config;
mod logging;
mod report;

use config::AppConfig;

const STAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
	Human,
	Json,
}

#[derive(Parser, Debug)]
#[command(
	name = "sheetsync",
	about = "Reconcile extracted report rows into Google Sheets"
)]
struct Cli {
	/// Path to the configuration file
	#[arg(long, short, default_value = "sheetsync.json")]
	config: PathBuf,

	/// Output format
	#[arg(long, value_enum, default_value = "human")]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Sync the configured datasets
	Run(RunArgs),
	/// Validate the configuration and show the managed columns
	Check,
	/// Write a starting configuration file
	Init,
}

#[derive(Args, Debug)]
struct RunArgs {
	/// Plan and report without writing anything
	#[arg(long, default_value_t = false)]
	dry_run: bool,

	/// Only sync this sheet (repeatable)
	#[arg(long, value_name = "SHEET")]
	only: Vec<String>,

	/// Don't write the run stamp
	#[arg(long, default_value_t = false)]
	no_stamp: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	match run(cli).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {e:#}");
			ExitCode::from(2)
		}
	}
}

async fn run(cli: Cli) -> Result<ExitCode> {
	match cli.command {
		Commands::Init => {
			AppConfig::template().save_new(&cli.config)?;
			println!("Config written to {}", cli.config.display());
			Ok(ExitCode::SUCCESS)
		}
		Commands::Check => {
			let (config, schema) = load_config(&cli.config)?;
			print_check(&config, &schema, cli.format)?;
			Ok(ExitCode::SUCCESS)
		}
		Commands::Run(args) => {
			let (config, _) = load_config(&cli.config)?;
			sync(&config, &args, cli.format).await
		}
	}
}

/// Loads, applies environment overrides, starts logging and validates. Any failure
/// here is fatal for the run.
fn load_config(path: &Path) -> Result<(AppConfig, Arc<ManagedSchema>)> {
	let mut config = AppConfig::load(path)?;
	config.apply_env(|var| std::env::var(var).ok());
	logging::init(config.log_dir.as_deref())?;

	let schema = config.validate().inspect_err(|e| error!("Invalid configuration: {e:#}"))?;
	Ok((config, schema))
}

async fn sync(config: &AppConfig, args: &RunArgs, format: OutputFormat) -> Result<ExitCode> {
	let datasets = config.select_datasets(&args.only)?;

	let client = SheetsClient::new(RequestConfig {
		client: reqwest::Client::new(),
		api_url: config.api_url.clone(),
		spreadsheet_id: config.spreadsheet_id.clone(),
		access_token: config.access_token.clone(),
	})?;
	let store = Arc::new(SheetsStore::new(client));

	let cancel = CancellationToken::new();
	tokio::spawn({
		let cancel = cancel.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("Interrupted, letting in-flight calls finish");
				cancel.cancel();
			}
		}
	});

	let orchestrator = Orchestrator::new(&config.sync, Arc::clone(&store) as _, cancel.clone())?
		.with_dry_run(args.dry_run);
	let source = DirectorySource::new(&config.source_dir);

	info!(
		spreadsheet = %config.spreadsheet_id,
		source_dir = %config.source_dir.display(),
		"Starting sheetsync"
	);
	let report = orchestrator.run(&source, &datasets).await;

	let mut stamp_failed = false;
	if let Some(range) = config
		.stamp_range
		.as_deref()
		.filter(|_| !args.dry_run && !args.no_stamp && !cancel.is_cancelled())
	{
		let now = Local::now().format(STAMP_FORMAT).to_string();
		match orchestrator
			.executor()
			.execute("stamp", || store.write_cell(range, &now))
			.await
		{
			Ok(()) => info!(%range, stamp = %now, "Updated run stamp"),
			Err(e) => {
				error!(%range, %e, "Failed to update run stamp");
				stamp_failed = true;
			}
		}
	}

	print_report(&report, format)?;

	Ok(if report.has_failures() || stamp_failed {
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	})
}

fn print_report(report: &SyncReport, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Human => println!("{}", report::report_table(report)),
		OutputFormat::Json => println!(
			"{}",
			serde_json::to_string_pretty(report).context("Failed to serialize report")?
		),
	}
	Ok(())
}

fn print_check(config: &AppConfig, schema: &ManagedSchema, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Human => {
			println!("{}", report::schema_table(schema));
			println!();
			for dataset in &config.datasets {
				println!("{} <- files matching '{}'", dataset.sheet, dataset.key);
			}
			println!();
			println!("Source directory: {}", config.source_dir.display());
		}
		OutputFormat::Json => println!(
			"{}",
			serde_json::to_string_pretty(&json!({
				"schema": schema.fields(),
				"identity": schema.identity_field(),
				"datasets": config.datasets,
				"source_dir": config.source_dir,
			}))?
		),
	}
	Ok(())
}
