//! Bounded retry with exponential backoff for every remote call.
//!
//! ```text
//! Idle -> Attempting -> Success
//!             |  ^
//!             v  |
//!           Retrying -> TerminalFailure
//! ```
//!
//! Attempt `n` that fails with a transient error is followed by a sleep of
//! `base_delay * 2^(n-1)` plus a random jitter in `[0, max_jitter)`. Permanent errors and
//! exhausted attempts end in [`ExecutorError::TerminalFailure`]. The executor never assumes
//! the wrapped operation is idempotent.

use std::{future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{ExecutorError, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	#[serde(rename = "base_delay_secs", with = "secs")]
	pub base_delay: Duration,
	#[serde(rename = "max_jitter_secs", with = "secs")]
	pub max_jitter: Duration,
	#[serde(rename = "attempt_timeout_secs", with = "opt_secs")]
	pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(2),
			max_jitter: Duration::from_secs(1),
			attempt_timeout: None,
		}
	}
}

impl RetryPolicy {
	/// Backoff before attempt `failed_attempt + 1`, without jitter.
	#[must_use]
	pub fn backoff(&self, failed_attempt: u32) -> Duration {
		let exponent = failed_attempt.saturating_sub(1).min(16);
		self.base_delay.saturating_mul(1 << exponent)
	}

	fn jitter(&self) -> Duration {
		if self.max_jitter.is_zero() {
			return Duration::ZERO;
		}
		self.max_jitter.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
	}
}

enum State<T> {
	Attempting(u32),
	Retrying { failed_attempt: u32, error: RemoteError },
	Success(T),
	TerminalFailure { attempts: u32, error: RemoteError },
}

/// Runs remote operations under a [`RetryPolicy`], honouring a run-wide cancellation
/// token. Cloning is cheap and clones share the token.
#[derive(Debug, Clone)]
pub struct Executor {
	policy: RetryPolicy,
	cancel: CancellationToken,
}

impl Executor {
	#[must_use]
	pub const fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
		Self { policy, cancel }
	}

	#[must_use]
	pub const fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	#[must_use]
	pub const fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Runs `operation` until it succeeds, fails permanently, runs out of attempts or the
	/// run is cancelled. Cancellation is only observed between attempts and while backing
	/// off; an attempt already in flight is allowed to finish.
	pub async fn execute<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, ExecutorError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, RemoteError>>,
	{
		let max_attempts = self.policy.max_attempts.max(1);
		let mut state = State::Attempting(1);

		loop {
			state = match state {
				State::Attempting(attempt) => {
					if self.cancel.is_cancelled() {
						return Err(self.cancelled(name, attempt - 1));
					}

					let result = match self.policy.attempt_timeout {
						Some(limit) => timeout(limit, operation())
							.await
							.unwrap_or(Err(RemoteError::TimedOut(limit))),
						None => operation().await,
					};

					match result {
						Ok(value) => State::Success(value),
						Err(error) if error.is_transient() && attempt < max_attempts => {
							State::Retrying {
								failed_attempt: attempt,
								error,
							}
						}
						Err(error) => State::TerminalFailure {
							attempts: attempt,
							error,
						},
					}
				}

				State::Retrying {
					failed_attempt,
					error,
				} => {
					let delay = self.policy.backoff(failed_attempt) + self.policy.jitter();
					warn!(
						operation = name,
						attempt = failed_attempt,
						max_attempts,
						delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
						%error,
						"Remote call failed, retrying"
					);

					tokio::select! {
						() = self.cancel.cancelled() => {
							return Err(self.cancelled(name, failed_attempt));
						}
						() = sleep(delay) => State::Attempting(failed_attempt + 1),
					}
				}

				State::Success(value) => return Ok(value),

				State::TerminalFailure { attempts, error } => {
					error!(
						operation = name,
						attempts,
						%error,
						"Remote call failed for good"
					);
					return Err(ExecutorError::TerminalFailure {
						operation: name.to_string(),
						attempts,
						source: error,
					});
				}
			};
		}
	}

	fn cancelled(&self, name: &str, attempts: u32) -> ExecutorError {
		debug!(operation = name, attempts, "Remote call cancelled");
		ExecutorError::Cancelled {
			operation: name.to_string(),
			attempts,
		}
	}
}

mod secs {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_f64(value.as_secs_f64())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let secs = f64::deserialize(deserializer)?;
		Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
	}
}

mod opt_secs {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	#[allow(clippy::ref_option)]
	pub fn serialize<S: Serializer>(
		value: &Option<Duration>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match value {
			Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<Duration>, D::Error> {
		Option::<f64>::deserialize(deserializer)?
			.map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
			.transpose()
	}
}
