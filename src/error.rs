//! Credential error types shared across construction, acquisition, and command glue.

// std
use std::io;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical credential error exposed by public APIs.
///
/// Every failure is returned to the immediate caller; nothing is suppressed, retried, or
/// logged on the error path, and no partial state survives a failed acquisition.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal to construction, never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The assertion token file could not be read; the exchange was never attempted.
	#[error("Failed to read the assertion token file `{}`.", .path.display())]
	AssertionRead {
		/// Path of the unreadable assertion file.
		path: PathBuf,
		/// Underlying filesystem failure.
		#[source]
		source: io::Error,
	},
	/// The token exchange against the authority failed; nothing was cached.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// The cluster command collaborator reported a failure.
	#[error("Cluster command execution failed.")]
	Command {
		/// Collaborator-specific failure.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Wraps a command collaborator failure inside [`Error::Command`].
	pub fn command(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Command { source: Box::new(src) }
	}
}

/// Construction-time configuration failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or empty.
	#[error("`{name}` must be set.")]
	MissingVariable {
		/// Name of the first missing variable in the fixed check order.
		name: &'static str,
	},
	/// The token endpoint derived from the authority host does not parse.
	#[error("Derived authority URL `{url}` is invalid.")]
	InvalidAuthority {
		/// The offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Failures surfaced by the token exchange itself.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Authority rejected the grant (bad assertion, unknown client, disabled principal).
	#[error("Authority rejected the token exchange: {reason}.")]
	Rejected {
		/// OAuth error code plus description when the authority supplied one.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Authority returned a malformed token response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the authority.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the authority.")]
	Io(#[from] io::Error),
	/// Exchange failed before or after the HTTP roundtrip.
	#[error("Token exchange failed: {message}.")]
	Protocol {
		/// Protocol-level failure summary.
		message: String,
	},
	/// Token response carried neither `expires_on` nor `expires_in`.
	#[error("Token response is missing an expiry.")]
	MissingExpiry,
	/// Token response expiry could not be interpreted.
	#[error("Token response expiry `{raw}` is invalid.")]
	InvalidExpiry {
		/// The raw expiry value from the response.
		raw: String,
	},
}
impl ExchangeError {
	/// Wraps a transport-specific network error inside [`ExchangeError::Network`].
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
