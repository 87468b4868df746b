use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "sheetsync=info,ss_reconcile=info,ss_sheets=info,ss_source=info";
const LOG_FILE: &str = "sheetsync.log";

/// Console logging on stderr (stdout carries the report), plus a daily rolling file in
/// `log_dir` when given. `RUST_LOG` replaces the default filter.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
	let file_layer = log_dir
		.map(|dir| {
			fs::create_dir_all(dir)
				.with_context(|| format!("Failed to create logs directory '{}'", dir.display()))?;

			Ok::<_, anyhow::Error>(
				fmt::layer()
					.with_target(true)
					// No ANSI colors in log files
					.with_ansi(false)
					.with_writer(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE)),
			)
		})
		.transpose()?;

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
		.with(fmt::layer().with_target(true).with_writer(io::stderr))
		.with(file_layer)
		.try_init()
		.context("Failed to initialize tracing")
}
