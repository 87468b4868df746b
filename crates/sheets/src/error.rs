use reqwest::StatusCode;
use ss_reconcile::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid api url '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("sheets api answered {status}: {body}")]
	Status { status: StatusCode, body: String },
}

impl Error {
	/// Whether the same request may succeed if sent again later.
	#[must_use]
	pub fn is_transient(&self) -> bool {
		match self {
			Self::InvalidUrl { .. } => false,
			Self::Request(e) => {
				e.is_timeout()
					|| e.is_connect()
					|| e.status().is_some_and(is_transient_status)
					|| (e.is_request() && !e.is_builder())
			}
			Self::Status { status, .. } => is_transient_status(*status),
		}
	}
}

/// Rate limiting and server-side trouble are worth retrying; anything else the API
/// rejected will be rejected again.
#[must_use]
pub fn is_transient_status(status: StatusCode) -> bool {
	status == StatusCode::TOO_MANY_REQUESTS
		|| status == StatusCode::REQUEST_TIMEOUT
		|| status.is_server_error()
}

impl From<Error> for RemoteError {
	fn from(e: Error) -> Self {
		if e.is_transient() {
			Self::transient(e)
		} else {
			Self::permanent(e)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status(code: u16) -> Error {
		Error::Status {
			status: StatusCode::from_u16(code).unwrap(),
			body: String::new(),
		}
	}

	#[test]
	fn classifies_statuses() {
		for code in [408, 429, 500, 502, 503, 504] {
			assert!(status(code).is_transient(), "{code}");
			assert!(RemoteError::from(status(code)).is_transient());
		}
		for code in [400, 401, 403, 404] {
			assert!(!status(code).is_transient(), "{code}");
			assert!(matches!(RemoteError::from(status(code)), RemoteError::Permanent(_)));
		}
	}
}
