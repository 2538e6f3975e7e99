//! Demonstrates plugging an in-process backend into [`ApiClient`] through [`ApiHttpClient`].
//!
//! 1. Implement [`ApiHttpClient::execute`] so every request resolves to an [`ApiResponse`] or a
//!    [`TransportError`].
//! 2. Pass the transport to [`ApiClient::with_http_client`] together with a session store.
//! 3. Expire the backend's tokens and watch the client refresh and replay transparently.
//! 4. Swap in an unreachable transport and read the user-facing connection message.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use color_eyre::{Result, eyre::eyre};
use serde_json::{Value, json};
// self
use asahi_api::{
	auth::SignInCredentials,
	client::{ApiClient, SignOutReason},
	config::ClientConfig,
	error::TransportError,
	http::{ApiHttpClient, ApiRequest, ApiResponse, Method, TransportFuture},
	store::MemoryStore,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::new(Url::parse("https://api.asahi.example/")?)?;
	let client = ApiClient::<MockBackend>::with_http_client(
		config.clone(),
		Arc::new(MemoryStore::default()),
		MockBackend::online(),
	)
	.with_sign_out_hook(|reason: SignOutReason| {
		println!("Session ended ({}).", reason.as_str());
	});
	let user = client.sign_in(SignInCredentials::new("maria", "colheita")).await?;

	println!("Signed in as {} ({}).", user.name, user.username);

	client.http_client.expire_tokens();

	let fields = client.get("fields").await?.json::<Vec<Value>>()?;

	println!(
		"Fetched {} field(s) after {} refresh(es) and {} replay(s).",
		fields.len(),
		client.refresh_metrics.successes(),
		client.refresh_metrics.replays(),
	);

	let offline = ApiClient::<MockBackend>::with_http_client(
		config,
		Arc::new(MemoryStore::default()),
		MockBackend::offline(MockTransportError::DnsFailure { host: "api.asahi.example" }),
	);

	match offline.get("fields").await {
		Ok(_) => return Err(eyre!("The offline transport unexpectedly answered.")),
		Err(e) => println!("Offline transport surfaced as: {}", e.user_message()),
	}

	client.sign_out().await?;

	Ok(())
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
		}
	}
}
impl StdError for MockTransportError {}

/// Backend that issues numbered tokens and accepts only the latest one.
struct MockBackend {
	unreachable: Option<MockTransportError>,
	issued: AtomicU32,
	valid: Mutex<Option<String>>,
}
impl MockBackend {
	fn online() -> Self {
		Self { unreachable: None, issued: AtomicU32::new(0), valid: Mutex::new(None) }
	}

	fn offline(error: MockTransportError) -> Self {
		Self { unreachable: Some(error), ..Self::online() }
	}

	fn expire_tokens(&self) {
		if let Ok(mut valid) = self.valid.lock() {
			*valid = None;
		}
	}

	fn issue_tokens(&self) -> Value {
		let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
		let access_token = format!("access-{n}");

		if let Ok(mut valid) = self.valid.lock() {
			*valid = Some(access_token.clone());
		}

		json!({ "accessToken": access_token, "refreshToken": format!("refresh-{n}") })
	}

	fn answer(&self, request: &ApiRequest) -> ApiResponse {
		match (request.method, request.url.path()) {
			(Method::Post, "/sessions") => {
				let mut body = self.issue_tokens();

				body["user"] = json!({ "name": "Maria", "username": "maria" });

				ApiResponse::json_body(200, &body)
			},
			(Method::Post, "/sessions/refresh") => ApiResponse::json_body(200, &self.issue_tokens()),
			(Method::Delete, "/sessions") => ApiResponse::new(204, Vec::new()),
			_ => {
				let valid = self.valid.lock().ok().and_then(|valid| valid.clone());
				let presented = request.bearer.as_ref().map(|bearer| bearer.expose().to_owned());

				if valid.is_some() && valid == presented {
					ApiResponse::json_body(200, &json!([{ "id": 1, "name": "Talhão Norte" }]))
				} else {
					ApiResponse::json_body(401, &json!({ "message": "Expired access token." }))
				}
			},
		}
	}
}
impl ApiHttpClient for MockBackend {
	fn execute(&self, request: ApiRequest) -> TransportFuture {
		let outcome = match &self.unreachable {
			Some(error) => Err(TransportError::network(error.clone())),
			None => Ok(self.answer(&request)),
		};

		Box::pin(async move { outcome })
	}
}
