#![cfg(feature = "reqwest")]

mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use asahi_api::{
	auth::{SignInCredentials, User},
	client::{ReqwestApiClient, SignOutReason},
	config::ClientConfig,
	error::{CONNECTION_PROBLEM_MESSAGE, Error},
	store::MemoryStore,
	url::Url,
};
use common::*;

fn build_client(base_url: &str) -> (ReqwestApiClient, MemoryStore, SignOuts) {
	let base_url = Url::parse(base_url).expect("Mock server URL should parse successfully.");
	let config = ClientConfig::new(base_url).expect("Client config should build successfully.");
	let store = MemoryStore::default();
	let observed = SignOuts::default();
	let hook_log = observed.clone();
	let client = ReqwestApiClient::new(config, Arc::new(store.clone())).with_sign_out_hook(
		move |reason: SignOutReason| {
			hook_log.lock().expect("Sign-out log lock should not be poisoned.").push(reason);
		},
	);

	(client, store, observed)
}

#[tokio::test]
async fn sign_in_persists_the_session_and_authenticates_requests() {
	let server = MockServer::start_async().await;
	let sign_in = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/sessions")
				.json_body(json!({ "username": "maria", "password": "colheita" }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"user": { "name": "Maria", "username": "maria" },
				"accessToken": "access-1",
				"refreshToken": "refresh-1",
			}));
		})
		.await;
	let fields = server
		.mock_async(|when, then| {
			when.method(GET).path("/fields").header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "id": 1, "name": "Talhão 1" }]));
		})
		.await;
	let (client, store, observed) = build_client(&server.base_url());
	let user = client
		.sign_in(SignInCredentials::new("maria", "colheita"))
		.await
		.expect("Sign-in should succeed against the mock backend.");

	assert_eq!(user, User { name: "Maria".into(), username: "maria".into() });

	let response = client.get("/fields").await.expect("Authenticated request should succeed.");
	let body = response.json::<Vec<Value>>().expect("Field list should decode.");

	assert_eq!(body.len(), 1);
	assert_eq!(body[0]["name"], "Talhão 1");

	let snapshot = store.snapshot();

	assert_eq!(snapshot.get(&store_key("accessToken")).map(String::as_str), Some("access-1"));
	assert_eq!(snapshot.get(&store_key("refreshToken")).map(String::as_str), Some("refresh-1"));
	assert!(client.is_authenticated().await.expect("Reading the store should succeed."));
	assert!(sign_outs(&observed).is_empty());

	sign_in.assert_async().await;
	fields.assert_async().await;
}

#[tokio::test]
async fn rejected_sign_in_returns_the_backend_message() {
	let server = MockServer::start_async().await;
	let sign_in = server
		.mock_async(|when, then| {
			when.method(POST).path("/sessions");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "message": "Usuário ou senha inválidos." }));
		})
		.await;
	let (client, store, observed) = build_client(&server.base_url());
	let err = client
		.sign_in(SignInCredentials::new("maria", "errada"))
		.await
		.expect_err("Wrong credentials should be rejected.");

	assert!(matches!(err, Error::Api { status: 401, .. }), "Unexpected error: {err:?}");
	assert_eq!(err.user_message(), "Usuário ou senha inválidos.");
	assert!(store.is_empty());
	assert!(client.bearer_token().is_none());
	assert!(sign_outs(&observed).is_empty(), "A failed sign-in is not a sign-out.");

	sign_in.assert_async().await;
}

#[tokio::test]
async fn expired_token_is_refreshed_and_the_request_replayed() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/harvests").header("authorization", "Bearer access-stale");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "message": EXPIRED }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/sessions/refresh")
				.json_body(json!({ "refreshToken": STORED_REFRESH }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"accessToken": FRESH_ACCESS,
				"refreshToken": ROTATED_REFRESH,
			}));
		})
		.await;
	let replay = server
		.mock_async(|when, then| {
			when.method(GET).path("/harvests").header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").json_body(json!([]));
		})
		.await;
	let (client, store, observed) = build_client(&server.base_url());

	seed_session(&store, STALE_ACCESS, STORED_REFRESH).await;
	client.restore().await.expect("Restoring the seeded session should succeed.");

	let response = client.get("harvests").await.expect("The replay should succeed.");

	assert_eq!(response.status, 200);
	assert_eq!(
		store.snapshot().get(&store_key("refreshToken")).map(String::as_str),
		Some(ROTATED_REFRESH)
	);
	assert!(sign_outs(&observed).is_empty());

	expired.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	replay.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expired_requests_refresh_once_over_http() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer access-stale");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "message": EXPIRED }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/sessions/refresh")
				.json_body(json!({ "refreshToken": STORED_REFRESH }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({
					"accessToken": FRESH_ACCESS,
					"refreshToken": ROTATED_REFRESH,
				}))
				.delay(Duration::from_millis(150));
		})
		.await;
	let replays = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").json_body(json!([]));
		})
		.await;
	let (client, store, observed) = build_client(&server.base_url());

	seed_session(&store, STALE_ACCESS, STORED_REFRESH).await;
	client.restore().await.expect("Restoring the seeded session should succeed.");

	let tasks: Vec<_> = ["fields", "harvests", "clients"]
		.into_iter()
		.map(|path| {
			let client = client.clone();

			tokio::spawn(async move { client.get(path).await })
		})
		.collect();

	for task in tasks {
		let response = task
			.await
			.expect("Request task should not panic.")
			.expect("Every expired request should resolve with its replay.");

		assert_eq!(response.status, 200);
	}

	assert!(sign_outs(&observed).is_empty());

	expired.assert_calls_async(3).await;
	refresh.assert_calls_async(1).await;
	replays.assert_calls_async(3).await;
}

#[tokio::test]
async fn sign_out_revokes_the_refresh_token() {
	let server = MockServer::start_async().await;
	let revoke = server
		.mock_async(|when, then| {
			when.method(DELETE)
				.path("/sessions")
				.header("authorization", "Bearer access-stale")
				.json_body(json!({ "refreshToken": STORED_REFRESH }));
			then.status(204);
		})
		.await;
	let (client, store, observed) = build_client(&server.base_url());

	seed_session(&store, STALE_ACCESS, STORED_REFRESH).await;
	client.restore().await.expect("Restoring the seeded session should succeed.");
	client.sign_out().await.expect("Sign-out should succeed.");

	assert!(store.is_empty());
	assert_eq!(sign_outs(&observed), [SignOutReason::Requested]);

	revoke.assert_async().await;
}

#[tokio::test]
async fn unreachable_backend_reports_a_connection_problem() {
	let (client, _store, _observed) = build_client("http://127.0.0.1:9/");
	let err = client.get("fields").await.expect_err("Nothing listens on the discard port.");

	assert!(matches!(err, Error::Transport(_)), "Unexpected error: {err:?}");
	assert_eq!(err.user_message(), CONNECTION_PROBLEM_MESSAGE);
}
