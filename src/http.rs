//! Transport primitives for backend calls.
//!
//! [`ApiHttpClient`] is the client's only dependency on an HTTP stack. Implementations turn
//! an [`ApiRequest`] into an [`ApiResponse`] and report network failures as
//! [`TransportError`]; status handling (including the 401 refresh protocol) stays in
//! [`ApiClient`](crate::client::ApiClient). A request is considered *dispatched* once
//! [`ApiHttpClient::execute`] has been called and its future polled once; queued replays are
//! dispatched in arrival order under that definition.

// crates.io
use serde::de::DeserializeOwned;
#[cfg(feature = "reqwest")] use reqwest::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{ErrorBody, TokenSecret},
	error::TransportError,
};

/// Boxed future returned by [`ApiHttpClient::execute`].
///
/// The future owns everything it needs so queued replays can be handed between tasks.
pub type TransportFuture =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'static + Send>>;

/// Abstraction over HTTP transports used by the client.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with whatever status the backend answered.
	///
	/// The returned future may be lazy, but it must start sending no later than its first
	/// poll. Replays are polled once each, in order, before being handed to their callers.
	fn execute(&self, request: ApiRequest) -> TransportFuture;
}

/// HTTP verbs used by the backend API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the uppercase verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Fully resolved outbound request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// JSON body, if any.
	pub body: Option<serde_json::Value>,
	/// Bearer token sent as `Authorization: Bearer <token>`.
	pub bearer: Option<TokenSecret>,
}
impl ApiRequest {
	/// Creates a request without a body or bearer.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, body: None, bearer: None }
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets or replaces the bearer token.
	pub fn with_bearer(mut self, bearer: Option<TokenSecret>) -> Self {
		self.bearer = bearer;

		self
	}
}

/// Status and raw body returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Wraps a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Builds a response whose body is the serialized `value`.
	pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
		Self { status, body: value.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body, reporting the JSON path of the first mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Extracts `message` from an error body; malformed or empty bodies yield `None`.
	pub fn error_message(&self) -> Option<String> {
		serde_json::from_slice::<ErrorBody>(&self.body).ok().and_then(|body| body.message)
	}

	/// Converts a non-success response into [`Error::Api`].
	pub fn into_error(self) -> Error {
		Error::api(self.status, self.error_message())
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn execute(&self, request: ApiRequest) -> TransportFuture {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method.into(), request.url);

			if let Some(bearer) = request.bearer.as_ref() {
				let mut value = HeaderValue::from_str(&bearer.bearer_header())
					.map_err(TransportError::network)?;

				value.set_sensitive(true);
				builder = builder.header(AUTHORIZATION, value);
			}
			if let Some(body) = request.body.as_ref() {
				builder = builder.json(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse::new(status, body))
		})
	}
}
