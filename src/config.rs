//! Validated client settings: backend base URL, session endpoints, store key namespace, and
//! the expired-token sentinel.

// self
use crate::{_prelude::*, error::ConfigError, store::StoreKey};

/// Errors raised while building or validating [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot have paths joined onto it.
	#[error("The base URL cannot be used as a base: {url}.")]
	NotABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Session endpoint paths must be relative and non-empty.
	#[error("The {endpoint} path must be a non-empty relative path: `{path}`.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// The expired-token sentinel cannot be blank.
	#[error("The expired-token message cannot be empty.")]
	EmptyExpiredTokenMessage,
}

/// Immutable client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Backend root; always ends with `/` so relative paths join beneath it.
	pub base_url: Url,
	/// Path of the sign-in/sign-out endpoint.
	pub sessions_path: String,
	/// Path of the token refresh endpoint.
	pub refresh_path: String,
	/// Namespace prepended to every store key.
	pub store_prefix: String,
	/// 401 message that marks a refreshable token expiry.
	///
	/// The backend signals expiry only through this literal text. Any rewording on the
	/// server turns expiries into hard sign-outs.
	pub expired_token_message: String,
}
impl ClientConfig {
	/// Default namespace for persisted keys.
	pub const DEFAULT_STORE_PREFIX: &str = "asahi.";
	/// Literal message the backend returns for an expired access token.
	pub const EXPIRED_ACCESS_TOKEN_MESSAGE: &str = "Expired access token.";
	/// Default sign-in/sign-out path.
	pub const SESSIONS_PATH: &str = "sessions";
	/// Default refresh path.
	pub const REFRESH_PATH: &str = "sessions/refresh";

	/// Creates a builder seeded with defaults for every setting except the base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Builds a configuration with all defaults.
	pub fn new(base_url: Url) -> Result<Self, ClientConfigError> {
		Self::builder(base_url).build()
	}

	/// Resolves a request path against the base URL.
	///
	/// Paths that would leave the base URL's origin (absolute URLs to other hosts) are
	/// rejected so the bearer token is only ever sent to the backend.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let url = self
			.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })?;

		if url.origin() != self.base_url.origin() {
			return Err(ConfigError::ForeignOrigin { path: path.to_owned() });
		}

		Ok(url)
	}

	/// Returns the namespaced store key.
	pub fn store_key(&self, key: StoreKey) -> String {
		format!("{}{}", self.store_prefix, key.as_str())
	}

	/// Checks whether a 401 message is the expired-token sentinel.
	pub fn is_expired_token_message(&self, message: Option<&str>) -> bool {
		message == Some(self.expired_token_message.as_str())
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::NotABase { url: self.base_url.to_string() });
		}
		if self.expired_token_message.trim().is_empty() {
			return Err(ClientConfigError::EmptyExpiredTokenMessage);
		}

		validate_path("sessions", &self.sessions_path)?;
		validate_path("refresh", &self.refresh_path)?;

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Backend root.
	pub base_url: Url,
	/// Path of the sign-in/sign-out endpoint.
	pub sessions_path: String,
	/// Path of the token refresh endpoint.
	pub refresh_path: String,
	/// Namespace prepended to every store key.
	pub store_prefix: String,
	/// 401 message that marks a refreshable token expiry.
	pub expired_token_message: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder for the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			sessions_path: ClientConfig::SESSIONS_PATH.into(),
			refresh_path: ClientConfig::REFRESH_PATH.into(),
			store_prefix: ClientConfig::DEFAULT_STORE_PREFIX.into(),
			expired_token_message: ClientConfig::EXPIRED_ACCESS_TOKEN_MESSAGE.into(),
		}
	}

	/// Overrides the sign-in/sign-out path.
	pub fn sessions_path(mut self, path: impl Into<String>) -> Self {
		self.sessions_path = path.into();

		self
	}

	/// Overrides the refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the store key namespace (an empty prefix is allowed).
	pub fn store_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.store_prefix = prefix.into();

		self
	}

	/// Overrides the expired-token sentinel.
	pub fn expired_token_message(mut self, message: impl Into<String>) -> Self {
		self.expired_token_message = message.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let mut base_url = self.base_url;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let config = ClientConfig {
			base_url,
			sessions_path: self.sessions_path,
			refresh_path: self.refresh_path,
			store_prefix: self.store_prefix,
			expired_token_message: self.expired_token_message,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ClientConfigError> {
	let trimmed = path.trim_start_matches('/');

	if trimmed.trim().is_empty() || trimmed.contains("://") {
		Err(ClientConfigError::InvalidEndpointPath { endpoint, path: path.to_owned() })
	} else {
		Ok(())
	}
}
