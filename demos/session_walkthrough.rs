//! Signs in against a live backend, lists fields, and signs out.
//!
//! ```sh
//! ASAHI_API_URL=http://localhost:3333/ ASAHI_USERNAME=maria ASAHI_PASSWORD=secret \
//! 	cargo run --example session_walkthrough
//! ```
//!
//! The session is persisted to `ASAHI_SESSION_FILE` (default `asahi-session.json`), so a
//! second run restores it instead of signing in again.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::WrapErr};
use serde_json::Value;
// self
use asahi_api::{
	auth::SignInCredentials,
	client::{ReqwestApiClient, SignOutReason},
	config::ClientConfig,
	store::FileStore,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let base_url = env::var("ASAHI_API_URL").unwrap_or_else(|_| "http://localhost:3333/".into());
	let session_file =
		env::var("ASAHI_SESSION_FILE").unwrap_or_else(|_| "asahi-session.json".into());
	let config = ClientConfig::new(Url::parse(&base_url)?)?;
	let store = FileStore::open(&session_file)
		.wrap_err_with(|| format!("Failed to open the session file {session_file}."))?;
	let client = ReqwestApiClient::new(config, Arc::new(store)).with_sign_out_hook(
		|reason: SignOutReason| {
			println!("Signed out ({}); sign in again to continue.", reason.as_str());
		},
	);
	let user = match client.restore().await? {
		Some(user) => user,
		None => {
			let username = env::var("ASAHI_USERNAME").wrap_err("ASAHI_USERNAME is not set.")?;
			let password = env::var("ASAHI_PASSWORD").wrap_err("ASAHI_PASSWORD is not set.")?;

			client.sign_in(SignInCredentials::new(username, password)).await?
		},
	};

	println!("Welcome, {}.", user.name);

	match client.get("fields").await {
		Ok(response) => {
			let fields = response.json::<Vec<Value>>()?;

			println!("{} field(s) registered.", fields.len());
		},
		Err(e) => println!("Could not list fields: {}", e.user_message()),
	}

	if env::var_os("ASAHI_KEEP_SESSION").is_none() {
		client.sign_out().await?;
	}

	Ok(())
}
