// std
use std::{collections::HashMap, fs, path::Path, sync::Arc};
// crates.io
use httpmock::prelude::*;
use tempfile::NamedTempFile;
use time::{OffsetDateTime, UtcOffset};
// self
use azure_workload_credential::{
	credential::{TokenCredential, WorkloadIdentityCredential},
	env::{self, VarSource},
	error::{Error, ExchangeError},
	http::ReqwestHttpClient,
};

const TENANT_ID: &str = "test-tenant";
const TOKEN_PATH: &str = "/test-tenant/oauth2/token";

fn federation_vars(authority_host: &str, token_file: &Path) -> HashMap<String, String> {
	HashMap::from_iter([
		(env::AZURE_TENANT_ID.to_owned(), TENANT_ID.to_owned()),
		(env::AZURE_CLIENT_ID.to_owned(), "test-client".to_owned()),
		(env::AZURE_FEDERATED_TOKEN_FILE.to_owned(), token_file.display().to_string()),
		(env::AZURE_AUTHORITY_HOST.to_owned(), authority_host.to_owned()),
	])
}

fn build_credential(
	server: &MockServer,
	token_file: &Path,
) -> WorkloadIdentityCredential<ReqwestHttpClient> {
	let vars = VarSource::from_map(federation_vars(&server.url("/"), token_file));

	WorkloadIdentityCredential::from_vars(&vars, ReqwestHttpClient::default())
		.expect("Credential should build from a complete variable map.")
}

fn assertion_file(contents: &str) -> NamedTempFile {
	let file = NamedTempFile::new().expect("Assertion fixture file should be creatable.");

	fs::write(file.path(), contents).expect("Assertion fixture file should be writable.");

	file
}

#[tokio::test]
async fn cached_token_is_reused_without_any_io() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("assertion-one");
	let credential = build_credential(&server, token_file.path());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("assertion-one");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"cached-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let first = credential
		.acquire_token(&["https://management.example.com/.default"])
		.await
		.expect("Cold-cache acquisition should succeed.");

	// A cache hit must not touch the filesystem either; prove it by removing the file.
	fs::remove_file(token_file.path()).expect("Assertion fixture file should be removable.");

	let second = credential
		.acquire_token(&["https://management.example.com/.default"])
		.await
		.expect("Warm-cache acquisition should succeed.");

	assert_eq!(first.secret, "cached-token");
	assert_eq!(first, second);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn near_expiry_token_is_refreshed_with_a_fresh_assertion() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("assertion-one");
	let credential = build_credential(&server, token_file.path());
	let mut short_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("assertion-one");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"short-token\",\"token_type\":\"Bearer\",\"expires_in\":200}",
			);
		})
		.await;
	let first = credential
		.acquire_token(&["scope-a"])
		.await
		.expect("First acquisition should succeed.");

	assert_eq!(first.secret, "short-token");

	// The platform rotates the assertion; the refresh must pick up the new contents.
	fs::write(token_file.path(), "assertion-two")
		.expect("Assertion fixture file should be rewritable.");
	short_mock.delete_async().await;

	let long_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("assertion-two");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"long-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;

	// 200s remaining is under the five-minute floor, so this call re-exchanges.
	let second = credential
		.acquire_token(&["scope-a"])
		.await
		.expect("Refresh acquisition should succeed.");

	assert_eq!(second.secret, "long-token");

	// And the replacement is cached again.
	let third = credential
		.acquire_token(&["scope-a"])
		.await
		.expect("Post-refresh acquisition should succeed.");

	assert_eq!(second, third);

	long_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_exchange_leaves_no_stale_state() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("assertion-one");
	let credential = build_credential(&server, token_file.path());
	let mut rejection_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"AADSTS700016\"}",
			);
		})
		.await;
	let err = credential
		.acquire_token(&["scope-a"])
		.await
		.expect_err("A rejected exchange must surface to the caller.");

	match err {
		Error::Exchange(ExchangeError::Rejected { reason, status }) => {
			assert!(reason.contains("invalid_client"), "unexpected reason: {reason}");
			assert_eq!(status, Some(400));
		},
		other => panic!("expected a rejection, got {other:?}"),
	}

	rejection_mock.assert_calls_async(1).await;
	rejection_mock.delete_async().await;

	// Nothing was cached: the next call re-reads the (rotated) file and re-exchanges.
	fs::write(token_file.path(), "assertion-two")
		.expect("Assertion fixture file should be rewritable.");

	let success_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("assertion-two");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"recovered\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let recovered = credential
		.acquire_token(&["scope-a"])
		.await
		.expect("Recovery acquisition should succeed.");

	assert_eq!(recovered.secret, "recovered");

	success_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreadable_assertion_file_skips_the_exchange() {
	let server = MockServer::start_async().await;
	let missing = Path::new("/nonexistent/azure-identity-token");
	let credential = build_credential(&server, missing);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"unreachable\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let err = credential
		.acquire_token(&["scope-a"])
		.await
		.expect_err("An unreadable assertion file must fail the acquisition.");

	assert!(matches!(err, Error::AssertionRead { .. }));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn concurrent_cold_cache_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("assertion-one");
	let credential = Arc::new(build_credential(&server, token_file.path()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"shared-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let handles: Vec<_> = (0..10)
		.map(|_| {
			let credential = credential.clone();

			tokio::spawn(async move { credential.acquire_token(&["scope-a"]).await })
		})
		.collect();
	let mut tokens = Vec::new();

	for handle in handles {
		let token = handle
			.await
			.expect("Acquisition task should not panic.")
			.expect("Concurrent acquisition should succeed.");

		tokens.push(token);
	}

	assert_eq!(tokens.len(), 10);
	assert!(tokens.iter().all(|token| *token == tokens[0]));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn absolute_expiry_wins_and_is_utc() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("assertion-one");
	let credential = build_credential(&server, token_file.path());
	let expires_on = OffsetDateTime::now_utc().unix_timestamp() + 7_200;
	let body = format!(
		"{{\"access_token\":\"tok\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"expires_on\":\"{expires_on}\"}}",
	);
	let _mock = server
		.mock_async(move |when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await;
	let token = credential
		.acquire_token(&["scope-a"])
		.await
		.expect("Acquisition should succeed when expires_on is present.");

	assert_eq!(token.expires_at.unix_timestamp(), expires_on);
	assert_eq!(token.expires_at.offset(), UtcOffset::UTC);
}

#[tokio::test]
async fn exchange_posts_the_federated_grant_parameters() {
	let server = MockServer::start_async().await;
	let token_file = assertion_file("federated-assertion-value");
	let credential = build_credential(&server, token_file.path());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=test-client")
				.body_includes("client_assertion=federated-assertion-value")
				.body_includes("scope=scope-a");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"tok\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;

	credential
		.acquire_token(&["scope-a"])
		.await
		.expect("Acquisition should succeed when the grant parameters match.");

	mock.assert_async().await;
}
