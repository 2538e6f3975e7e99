//! Client-level error types shared by the transport, store, and session layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message shown to users when the backend cannot be reached.
pub const CONNECTION_PROBLEM_MESSAGE: &str = "Problem connecting to the server.";

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Backend answered with a non-success status other than a handled 401.
	#[error("Request failed with status {status}: {message}")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Backend-supplied `message`, or a status summary when the body had none.
		message: String,
	},
	/// Backend rejected the credentials for a reason other than token expiry; the session
	/// has been signed out.
	#[error("Authentication rejected: {message}")]
	AuthRejected {
		/// Backend-supplied `message`.
		message: String,
	},
	/// Token refresh failed; every request queued behind it receives a clone of the cause.
	#[error("Token refresh failed: {0}")]
	RefreshFailed(#[source] Arc<Error>),
	/// Every caller waiting on a token refresh was dropped before the refresh settled.
	#[error("Token refresh was abandoned before it settled.")]
	RefreshAbandoned,
	/// No refresh token is stored, so the session cannot be renewed.
	#[error("No refresh token is stored for the current session.")]
	MissingRefreshToken,
	/// Response body could not be decoded into the expected shape.
	#[error("Response body with status {status} could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// A request body or stored value could not be encoded as JSON.
	#[error("Value could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
	/// A stored value could not be decoded.
	#[error("Stored `{key}` value is not valid JSON.")]
	CorruptSession {
		/// Store key holding the malformed value.
		key: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl Error {
	/// Builds an [`Error::Api`] from a status and an optional backend message.
	pub fn api(status: u16, message: Option<String>) -> Self {
		Self::Api {
			status,
			message: message.unwrap_or_else(|| format!("Unexpected HTTP status {status}.")),
		}
	}

	/// Returns the HTTP status carried by the error, following refresh failures to their cause.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::AuthRejected { .. } => Some(401),
			Self::RefreshFailed(cause) => cause.status(),
			_ => None,
		}
	}

	/// Text suitable for an error notification: the backend's own message when a response
	/// arrived, a connection notice when none did, and the error text otherwise.
	pub fn user_message(&self) -> String {
		match self {
			Self::Api { message, .. } | Self::AuthRejected { message } => message.clone(),
			Self::Transport(_) => CONNECTION_PROBLEM_MESSAGE.into(),
			Self::RefreshFailed(cause) => cause.user_message(),
			other => other.to_string(),
		}
	}
}

/// Configuration failures raised while building or using the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client settings failed validation.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
	/// A request path cannot be resolved against the base URL.
	#[error("Path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A request path resolved to a different origin than the base URL.
	#[error("Path `{path}` resolves outside the backend origin.")]
	ForeignOrigin {
		/// Path supplied by the caller.
		path: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
