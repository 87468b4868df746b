//! Run configuration handed to the engine by its caller.
//!
//! Nothing here touches the filesystem or the environment: the binary loads a
//! [`SyncConfig`] however it likes and the engine only ever sees the validated result.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigurationError, executor::RetryPolicy, schema::ManagedSchema};

/// Names of the derived identity field and of the business fields it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityFields {
	pub field: String,
	pub document: String,
	pub date: String,
	pub request_type: String,
}

impl Default for IdentityFields {
	fn default() -> Self {
		Self {
			field: "ID_Unico".to_string(),
			document: "CPF/Passaporte".to_string(),
			date: "Previsto Para".to_string(),
			request_type: "Tipo de Pedido".to_string(),
		}
	}
}

impl IdentityFields {
	/// The three business fields, in identity order.
	#[must_use]
	pub fn required(&self) -> [&str; 3] {
		[
			self.document.as_str(),
			self.date.as_str(),
			self.request_type.as_str(),
		]
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Managed fields, in remote column order.
	pub schema: Vec<String>,
	pub identity: IdentityFields,
	/// Text that marks the header row of a source table.
	pub header_anchor: String,
	/// How many leading source rows may precede the header.
	pub header_search_rows: usize,
	/// Sanitized source column name to canonical managed field.
	pub column_aliases: BTreeMap<String, String>,
	pub retry: RetryPolicy,
	/// Datasets processed at the same time.
	pub concurrency: usize,
}

pub const DEFAULT_SCHEMA: [&str; 14] = [
	"ID_Unico",
	"Paciente",
	"CPF/Passaporte",
	"Função",
	"Setor",
	"Empresa",
	"Grupo",
	"Local do Atendimento",
	"Atendido Em",
	"Previsto Para",
	"Liberado Em",
	"Status Expedição - BR MED",
	"Exame Alterado",
	"Tipo de Pedido",
];

const DEFAULT_ALIASES: [(&str, &str); 14] = [
	("CPF_Passaporte", "CPF/Passaporte"),
	("Local_do_Atendimento", "Local do Atendimento"),
	("Atendido_Em", "Atendido Em"),
	("Previsto_Para", "Previsto Para"),
	("Liberado_Em", "Liberado Em"),
	("Status_Expedicao___BR_MED", "Status Expedição - BR MED"),
	("Status_Expedicao_BR_MED", "Status Expedição - BR MED"),
	("Exame_Alterado", "Exame Alterado"),
	("Tipo_de_Pedido", "Tipo de Pedido"),
	("Funcao", "Função"),
	("Paciente", "Paciente"),
	("Setor", "Setor"),
	("Empresa", "Empresa"),
	("Grupo", "Grupo"),
];

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			schema: DEFAULT_SCHEMA.iter().map(ToString::to_string).collect(),
			identity: IdentityFields::default(),
			header_anchor: "Paciente".to_string(),
			header_search_rows: 10,
			column_aliases: DEFAULT_ALIASES
				.iter()
				.map(|(from, to)| ((*from).to_string(), (*to).to_string()))
				.collect(),
			retry: RetryPolicy::default(),
			concurrency: 4,
		}
	}
}

impl SyncConfig {
	/// Checks the configuration and builds the managed schema from it.
	pub fn validate(&self) -> Result<Arc<ManagedSchema>, ConfigurationError> {
		let schema = ManagedSchema::new(self.schema.iter().cloned(), &self.identity.field)?;

		for (field, role) in [
			(&self.identity.document, "identity document"),
			(&self.identity.date, "identity date"),
			(&self.identity.request_type, "identity request type"),
		] {
			if schema.position(field).is_none() {
				return Err(ConfigurationError::MissingField {
					field: field.clone(),
					role,
				});
			}
		}

		if self.identity.required().contains(&self.identity.field.as_str()) {
			return Err(ConfigurationError::Invalid(format!(
				"identity field '{}' can't also be one of its own inputs",
				self.identity.field
			)));
		}

		if self.header_anchor.trim().is_empty() {
			return Err(ConfigurationError::Invalid(
				"header anchor must not be blank".to_string(),
			));
		}

		if self.retry.max_attempts == 0 {
			return Err(ConfigurationError::ZeroAttempts);
		}

		if self.concurrency == 0 {
			return Err(ConfigurationError::ZeroConcurrency);
		}

		Ok(Arc::new(schema))
	}
}
