//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{
	sync::{Arc, Mutex},
	time::Duration,
};
// crates.io
use serde_json::{Value, json};
// self
use asahi_api::{
	client::{ApiClient, SignOutReason},
	config::ClientConfig,
	error::TransportError,
	http::{ApiHttpClient, ApiRequest, ApiResponse, Method, TransportFuture},
	store::{MemoryStore, SessionStore},
	url::Url,
};

pub const STALE_ACCESS: &str = "access-stale";
pub const FRESH_ACCESS: &str = "access-fresh";
pub const STORED_REFRESH: &str = "refresh-0";
pub const ROTATED_REFRESH: &str = "refresh-1";
pub const EXPIRED: &str = "Expired access token.";

/// One call observed by [`ScriptedHttpClient`], recorded at dispatch time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
	pub method: Method,
	pub path: String,
	pub bearer: Option<String>,
	pub body: Option<Value>,
}
impl Dispatch {
	pub fn is_refresh(&self) -> bool {
		self.method == Method::Post && self.path == "/sessions/refresh"
	}
}

/// Canned answer for one dispatched request.
pub struct Scripted {
	pub response: ApiResponse,
	pub delay: Option<Duration>,
}
impl Scripted {
	pub fn json(status: u16, body: Value) -> Self {
		Self { response: ApiResponse::json_body(status, &body), delay: None }
	}

	pub fn expired() -> Self {
		Self::json(401, json!({ "message": EXPIRED }))
	}

	pub fn delayed(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}
}

type Responder = Box<dyn Fn(&Dispatch) -> Scripted + Send + Sync>;

type DispatchLog = Arc<Mutex<Vec<Dispatch>>>;

/// In-memory transport that answers from a script and logs every dispatch, either when
/// `execute` is called or, like reqwest, only once the returned future is first polled.
pub struct ScriptedHttpClient {
	log: DispatchLog,
	log_on_poll: bool,
	responder: Responder,
}
impl ScriptedHttpClient {
	pub fn new(responder: impl Fn(&Dispatch) -> Scripted + Send + Sync + 'static) -> Self {
		Self { log: DispatchLog::default(), log_on_poll: false, responder: Box::new(responder) }
	}

	pub fn lazy(responder: impl Fn(&Dispatch) -> Scripted + Send + Sync + 'static) -> Self {
		Self { log_on_poll: true, ..Self::new(responder) }
	}

	pub fn log(&self) -> Vec<Dispatch> {
		self.log.lock().expect("Dispatch log lock should not be poisoned.").clone()
	}

	pub fn refresh_calls(&self) -> usize {
		self.log().iter().filter(|dispatch| dispatch.is_refresh()).count()
	}
}
impl ApiHttpClient for ScriptedHttpClient {
	fn execute(&self, request: ApiRequest) -> TransportFuture {
		let dispatch = Dispatch {
			method: request.method,
			path: request.url.path().to_owned(),
			bearer: request.bearer.as_ref().map(|bearer| bearer.expose().to_owned()),
			body: request.body.clone(),
		};
		let Scripted { response, delay } = (self.responder)(&dispatch);
		let log = self.log.clone();
		let mut deferred = None;

		if self.log_on_poll {
			deferred = Some(dispatch);
		} else {
			log.lock().expect("Dispatch log lock should not be poisoned.").push(dispatch);
		}

		Box::pin(async move {
			if let Some(dispatch) = deferred {
				log.lock().expect("Dispatch log lock should not be poisoned.").push(dispatch);
			}
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			Ok::<_, TransportError>(response)
		})
	}
}

/// Answers the refresh call with the rotated pair, rejects the stale token as expired, and
/// echoes the path for anything carrying the fresh token.
pub fn rotating_backend(refresh_delay: Duration) -> ScriptedHttpClient {
	ScriptedHttpClient::new(move |dispatch| {
		if dispatch.is_refresh() {
			return Scripted::json(
				200,
				json!({ "accessToken": FRESH_ACCESS, "refreshToken": ROTATED_REFRESH }),
			)
			.delayed(refresh_delay);
		}

		match dispatch.bearer.as_deref() {
			Some(FRESH_ACCESS) => Scripted::json(200, json!({ "path": dispatch.path })),
			_ => Scripted::expired(),
		}
	})
}

pub fn base_url() -> Url {
	Url::parse("http://asahi.test/").expect("Test base URL should parse successfully.")
}

pub fn config() -> ClientConfig {
	ClientConfig::new(base_url()).expect("Test client config should build successfully.")
}

pub fn store_key(name: &str) -> String {
	format!("{}{name}", ClientConfig::DEFAULT_STORE_PREFIX)
}

pub async fn seed_session(store: &MemoryStore, access_token: &str, refresh_token: &str) {
	store
		.set(&store_key("user"), json!({ "name": "Maria", "username": "maria" }).to_string())
		.await
		.expect("Seeding the user should succeed.");
	store
		.set(&store_key("accessToken"), access_token.into())
		.await
		.expect("Seeding the access token should succeed.");
	store
		.set(&store_key("refreshToken"), refresh_token.into())
		.await
		.expect("Seeding the refresh token should succeed.");
}

/// Sign-out reasons observed by a test hook.
pub type SignOuts = Arc<Mutex<Vec<SignOutReason>>>;

pub fn sign_outs(sign_outs: &SignOuts) -> Vec<SignOutReason> {
	sign_outs.lock().expect("Sign-out log lock should not be poisoned.").clone()
}

/// Builds a client over `transport` with a seeded, restored session and a recording hook.
pub async fn signed_in_client(
	transport: ScriptedHttpClient,
) -> (ApiClient<ScriptedHttpClient>, MemoryStore, SignOuts) {
	let store = MemoryStore::default();

	seed_session(&store, STALE_ACCESS, STORED_REFRESH).await;

	let observed = SignOuts::default();
	let hook_log = observed.clone();
	let client = ApiClient::<ScriptedHttpClient>::with_http_client(
		config(),
		Arc::new(store.clone()),
		transport,
	)
	.with_sign_out_hook(move |reason: SignOutReason| {
		hook_log.lock().expect("Sign-out log lock should not be poisoned.").push(reason);
	});

	client.restore().await.expect("Restoring the seeded session should succeed.");

	(client, store, observed)
}
