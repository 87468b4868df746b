//! `sheetsync.json`: where to read from, where to write to, and how to reconcile.

use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use ss_reconcile::{DatasetSpec, ManagedSchema, SyncConfig};

pub const SPREADSHEET_ID_VAR: &str = "SHEETSYNC_SPREADSHEET_ID";
pub const ACCESS_TOKEN_VAR: &str = "SHEETSYNC_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub spreadsheet_id: String,
	pub api_url: String,
	/// Usually left empty in the file and provided through the environment.
	pub access_token: String,
	/// Cell that receives the time of the last completed run, e.g. `'Resumo'!B1`.
	pub stamp_range: Option<String>,
	/// Directory holding the extracted row dumps.
	pub source_dir: PathBuf,
	/// Daily rolling log files go here when set.
	pub log_dir: Option<PathBuf>,
	pub datasets: Vec<DatasetSpec>,
	pub sync: SyncConfig,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			spreadsheet_id: String::new(),
			api_url: ss_sheets::DEFAULT_API_URL.to_string(),
			access_token: String::new(),
			stamp_range: None,
			source_dir: PathBuf::from("downloads"),
			log_dir: None,
			datasets: Vec::new(),
			sync: SyncConfig::default(),
		}
	}
}

impl AppConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let json = fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file '{}'", path.display()))?;

		serde_json::from_str(&json)
			.with_context(|| format!("Failed to parse config file '{}'", path.display()))
	}

	/// Writes a config file, refusing to overwrite an existing one.
	pub fn save_new(&self, path: &Path) -> Result<()> {
		if path.exists() {
			bail!("'{}' already exists", path.display());
		}

		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}

		fs::write(path, serde_json::to_string_pretty(self)?)
			.with_context(|| format!("Failed to write config file '{}'", path.display()))
	}

	/// Values from the environment win over the file.
	pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
		if let Some(id) = var(SPREADSHEET_ID_VAR).filter(|v| !v.trim().is_empty()) {
			self.spreadsheet_id = id;
		}
		if let Some(token) = var(ACCESS_TOKEN_VAR).filter(|v| !v.trim().is_empty()) {
			self.access_token = token;
		}
	}

	/// Everything a run needs before any I/O happens.
	pub fn validate(&self) -> Result<Arc<ManagedSchema>> {
		if self.spreadsheet_id.trim().is_empty() {
			bail!("spreadsheet_id is not set (config file or {SPREADSHEET_ID_VAR})");
		}
		if self.access_token.trim().is_empty() {
			bail!("access_token is not set (config file or {ACCESS_TOKEN_VAR})");
		}
		if self.datasets.is_empty() {
			bail!("no datasets configured");
		}

		let mut sheets = self.datasets.iter().map(|d| &d.sheet).collect::<Vec<_>>();
		sheets.sort();
		if let Some(pair) = sheets.windows(2).find(|pair| pair[0] == pair[1]) {
			bail!("sheet '{}' is configured for more than one dataset", pair[0]);
		}

		Ok(self.sync.validate()?)
	}

	/// Datasets to run, limited to the named sheets when `only` isn't empty.
	pub fn select_datasets(&self, only: &[String]) -> Result<Vec<DatasetSpec>> {
		if only.is_empty() {
			return Ok(self.datasets.clone());
		}

		if let Some(unknown) = only
			.iter()
			.find(|name| !self.datasets.iter().any(|d| &d.sheet == *name))
		{
			bail!("unknown sheet '{unknown}'");
		}

		Ok(self
			.datasets
			.iter()
			.filter(|d| only.contains(&d.sheet))
			.cloned()
			.collect())
	}

	/// A starting point for `sheetsync init`.
	#[must_use]
	pub fn template() -> Self {
		Self {
			stamp_range: Some("'Resumo'!B1".to_string()),
			datasets: vec![DatasetSpec::new("trigo", "GRUPO TRIGO")],
			..Self::default()
		}
	}
}
