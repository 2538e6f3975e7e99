//! Authenticated API client: bearer injection plus the expired-token refresh protocol.
//!
//! Every request carries the in-memory bearer token. A 401 whose body message equals the
//! configured sentinel (`"Expired access token."`) never reaches the caller: the request is
//! queued, a single refresh runs, and the queue is replayed in arrival order with the new
//! token (or failed as a whole if the refresh fails). Any other 401 signs the session out.

pub mod refresh;
pub mod session;

pub use refresh::{RefreshMetrics, RefreshPhase};

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	http::{ApiHttpClient, ApiRequest, ApiResponse, Method, TransportFuture},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{SessionStore, StoreKey},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use refresh::RefreshQueue;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Why a session was signed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignOutReason {
	/// The caller asked for it via [`ApiClient::sign_out`].
	Requested,
	/// The backend answered 401 with a message other than the expiry sentinel.
	AuthRejected,
	/// The token refresh call failed.
	RefreshFailed,
}
impl SignOutReason {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SignOutReason::Requested => "requested",
			SignOutReason::AuthRejected => "auth_rejected",
			SignOutReason::RefreshFailed => "refresh_failed",
		}
	}
}

/// Receives sign-out notifications so the embedding UI can route to its sign-in screen.
pub trait SignOutHook
where
	Self: Send + Sync,
{
	/// Called once the stored credentials and the bearer token have been cleared.
	fn signed_out(&self, reason: SignOutReason);
}
impl<F> SignOutHook for F
where
	F: Fn(SignOutReason) + Send + Sync,
{
	fn signed_out(&self, reason: SignOutReason) {
		self(reason)
	}
}

/// Hook that ignores sign-outs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSignOutHook;
impl SignOutHook for NoopSignOutHook {
	fn signed_out(&self, _reason: SignOutReason) {}
}

/// Tokens removed from the store during a sign-out.
#[derive(Debug, Default)]
pub(crate) struct ClearedSession {
	pub(crate) access_token: Option<TokenSecret>,
	pub(crate) refresh_token: Option<TokenSecret>,
}

/// Backend client shared by every caller of the application.
///
/// Construct one instance at startup and hand out clones; clones share the bearer token,
/// the refresh queue, and the store, which is what keeps refreshes single-flight.
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Transport used for every outbound request.
	pub http_client: Arc<C>,
	/// Persistent store for the user and the token pair.
	pub store: Arc<dyn SessionStore>,
	/// Validated client settings.
	pub config: ClientConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	sign_out_hook: Arc<dyn SignOutHook>,
	bearer: Arc<RwLock<Option<TokenSecret>>>,
	refresh: Arc<Mutex<RefreshQueue>>,
	credentials: Arc<AsyncMutex<()>>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			sign_out_hook: Arc::new(NoopSignOutHook),
			bearer: Default::default(),
			refresh: Default::default(),
			credentials: Default::default(),
		}
	}

	/// Installs the hook notified after every sign-out.
	pub fn with_sign_out_hook(mut self, hook: impl SignOutHook + 'static) -> Self {
		self.sign_out_hook = Arc::new(hook);

		self
	}

	/// Current in-memory bearer token.
	pub fn bearer_token(&self) -> Option<TokenSecret> {
		self.bearer.read().clone()
	}

	/// Replaces the in-memory bearer token without touching the store.
	pub fn set_bearer_token(&self, token: Option<TokenSecret>) {
		*self.bearer.write() = token;
	}

	/// Issues a request and resolves with the backend's 2xx response.
	///
	/// Expired-token 401s are absorbed: the caller receives the replayed response, or
	/// [`Error::RefreshFailed`] if the refresh failed. Other 401s sign the session out and
	/// return [`Error::AuthRejected`]. Every other non-2xx status returns [`Error::Api`].
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut request = ApiRequest::new(method, self.config.endpoint(path)?);

				if let Some(body) = body {
					request = request.with_body(body);
				}

				self.execute(request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// `GET path`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.request(Method::Get, path, None).await
	}

	/// `POST path` with an optional JSON body.
	pub async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<ApiResponse> {
		self.request(Method::Post, path, body).await
	}

	/// `PUT path` with an optional JSON body.
	pub async fn put(&self, path: &str, body: Option<serde_json::Value>) -> Result<ApiResponse> {
		self.request(Method::Put, path, body).await
	}

	/// `PATCH path` with an optional JSON body.
	pub async fn patch(&self, path: &str, body: Option<serde_json::Value>) -> Result<ApiResponse> {
		self.request(Method::Patch, path, body).await
	}

	/// `DELETE path` with an optional JSON body.
	pub async fn delete(&self, path: &str, body: Option<serde_json::Value>) -> Result<ApiResponse> {
		self.request(Method::Delete, path, body).await
	}

	/// Runs the response interceptor loop for one logical request.
	async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		let mut in_flight = self.dispatch(request.clone());

		loop {
			let response = in_flight.await?;

			if response.is_success() {
				return Ok(response);
			}
			if response.status != 401 {
				return Err(response.into_error());
			}

			let message = response.error_message();

			if !self.config.is_expired_token_message(message.as_deref()) {
				self.clear_session(SignOutReason::AuthRejected).await;

				return Err(Error::AuthRejected { message: message.unwrap_or_default() });
			}

			// A replay that expires again simply queues behind the next refresh.
			in_flight = self.enqueue_for_refresh(request.clone()).await?;
		}
	}

	/// Hands the request to the transport, filling in the current bearer if none is set.
	pub(crate) fn dispatch(&self, mut request: ApiRequest) -> TransportFuture {
		if request.bearer.is_none() {
			request.bearer = self.bearer_token();
		}

		self.http_client.execute(request)
	}

	/// Removes every session key and the bearer, then notifies the hook.
	///
	/// Store failures are logged and ignored; clearing an already empty store is a no-op.
	pub(crate) async fn clear_session(&self, reason: SignOutReason) -> ClearedSession {
		let _credentials = self.credentials.lock().await;
		let mut cleared = ClearedSession::default();

		for key in StoreKey::ALL {
			let name = self.config.store_key(key);

			match self.store.remove(&name).await {
				Ok(Some(value)) => match key {
					StoreKey::AccessToken => cleared.access_token = Some(value.into()),
					StoreKey::RefreshToken => cleared.refresh_token = Some(value.into()),
					StoreKey::User => {},
				},
				Ok(None) => {},
				Err(err) => obs::trace_store_failure(&name, &err),
			}
		}

		let in_memory = self.bearer.write().take();

		if cleared.access_token.is_none() {
			cleared.access_token = in_memory;
		}

		obs::trace_sign_out(reason);
		self.sign_out_hook.signed_out(reason);

		cleared
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by its own reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Self {
		Self::with_http_client(config, store, ReqwestHttpClient::default())
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			sign_out_hook: self.sign_out_hook.clone(),
			bearer: self.bearer.clone(),
			refresh: self.refresh.clone(),
			credentials: self.credentials.clone(),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("bearer_set", &self.bearer.read().is_some())
			.field("refresh_phase", &self.refresh_phase())
			.finish()
	}
}
