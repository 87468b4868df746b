//!
//! # Reconcile
//!
//! Keeps remote tables in line with freshly extracted source rows without ever
//! clobbering what the remote side owns.
//!
//! Every source row is reshaped into the managed schema and given a deterministic
//! identity built from its document number, due date and request type. The identity is
//! what recognizes "the same record" across passes: records the remote table doesn't
//! know yet are appended, records whose managed fields drifted are overwritten in place,
//! and everything else is left alone. Columns past the managed span are never written.
//!
//! The source side and the remote side are collaborators behind [`SourceRows`] and
//! [`RemoteStore`]; every remote call goes through the [`Executor`], which retries
//! transient failures with exponential backoff and honours run-wide cancellation.
//!

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod adapter;
mod config;
mod diff;
mod error;
mod executor;
mod identity;
mod normalize;
mod plan;
mod schema;
mod snapshot;
mod sync;

pub use adapter::{DatasetSpec, RemoteStore, SourceRows};
pub use config::{IdentityFields, SyncConfig, DEFAULT_SCHEMA};
pub use diff::{classify, diff, ChangeSet, Classification};
pub use error::{
	BoxError, ConfigurationError, DatasetError, ExecutorError, NormalizeError, RemoteError,
	SnapshotError, SourceError,
};
pub use executor::{Executor, RetryPolicy};
pub use identity::{derive_identity, format_day_first, parse_day_first, IdentityParts};
pub use normalize::{sanitize_column_name, Normalizer, RawTable};
pub use plan::{plan, MutationPlan, RowUpdate};
pub use schema::{ManagedSchema, Record};
pub use snapshot::{read_snapshot, RemoteSnapshot, RowNumber};
pub use sync::{DatasetOutcome, Orchestrator, OutcomeStatus, SyncReport};
