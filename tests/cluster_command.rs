// std
use std::{
	io,
	sync::Mutex,
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use azure_workload_credential::{
	command::{
		CLUSTER_COMMAND_SCOPE, ClusterCommand, ClusterCommandClient, CommandFuture,
		CommandOutcome, run_cluster_command,
	},
	credential::{AccessToken, CredentialFuture, TokenCredential},
	error::{Error, ExchangeError},
};

#[derive(Debug)]
struct StaticCredential {
	scopes_seen: Mutex<Vec<String>>,
}
impl StaticCredential {
	fn new() -> Self {
		Self { scopes_seen: Mutex::new(Vec::new()) }
	}
}
impl TokenCredential for StaticCredential {
	fn acquire_token<'a>(&'a self, scopes: &'a [&'a str]) -> CredentialFuture<'a, AccessToken> {
		Box::pin(async move {
			self.scopes_seen
				.lock()
				.expect("Scope log should be lockable.")
				.extend(scopes.iter().map(|scope| (*scope).to_owned()));

			Ok(AccessToken {
				secret: "cluster-token".into(),
				expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
			})
		})
	}
}

#[derive(Debug)]
struct FailingCredential;
impl TokenCredential for FailingCredential {
	fn acquire_token<'a>(&'a self, _scopes: &'a [&'a str]) -> CredentialFuture<'a, AccessToken> {
		Box::pin(async move {
			Err(ExchangeError::Protocol { message: "authority unreachable".into() }.into())
		})
	}
}

#[derive(Default)]
struct RecordingClient {
	tokens_seen: Mutex<Vec<String>>,
}
impl ClusterCommandClient for RecordingClient {
	fn run_to_completion<'a>(
		&'a self,
		command: &'a ClusterCommand,
		cluster_token: &'a str,
	) -> CommandFuture<'a, CommandOutcome> {
		Box::pin(async move {
			self.tokens_seen
				.lock()
				.expect("Token log should be lockable.")
				.push(cluster_token.to_owned());

			let now = SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.expect("Clock should be past the epoch.")
				.as_secs() as i64;

			Ok(CommandOutcome {
				id: Some(format!("{}/{}/run-1", command.resource_group, command.cluster_name)),
				exit_code: Some(0),
				output: Some("pod/busybox created\n".into()),
				provisioning_state: Some("Succeeded".into()),
				started_at: OffsetDateTime::from_unix_timestamp(now).ok(),
				finished_at: OffsetDateTime::from_unix_timestamp(now).ok(),
				..Default::default()
			})
		})
	}
}

struct FailingClient;
impl ClusterCommandClient for FailingClient {
	fn run_to_completion<'a>(
		&'a self,
		_command: &'a ClusterCommand,
		_cluster_token: &'a str,
	) -> CommandFuture<'a, CommandOutcome> {
		Box::pin(async move {
			Err(Error::command(io::Error::new(io::ErrorKind::TimedOut, "poll timed out")))
		})
	}
}

#[tokio::test]
async fn run_supplies_the_cluster_scoped_token() {
	let credential = StaticCredential::new();
	let client = RecordingClient::default();
	let command = ClusterCommand::new("rg-1", "cluster-1", "kubectl get nodes");
	let outcome = run_cluster_command(&credential, &client, &command)
		.await
		.expect("A healthy credential and collaborator should succeed.");

	assert_eq!(outcome.exit_code, Some(0));
	assert_eq!(outcome.provisioning_state.as_deref(), Some("Succeeded"));
	assert_eq!(
		*credential.scopes_seen.lock().expect("Scope log should be lockable."),
		vec![CLUSTER_COMMAND_SCOPE.to_owned()],
	);
	assert_eq!(
		*client.tokens_seen.lock().expect("Token log should be lockable."),
		vec!["cluster-token".to_owned()],
	);
}

#[tokio::test]
async fn credential_failure_short_circuits_the_collaborator() {
	let client = RecordingClient::default();
	let command = ClusterCommand::new("rg-1", "cluster-1", "kubectl get nodes");
	let err = run_cluster_command(&FailingCredential, &client, &command)
		.await
		.expect_err("A failing credential must abort the run.");

	assert!(matches!(err, Error::Exchange(ExchangeError::Protocol { .. })));
	assert!(client.tokens_seen.lock().expect("Token log should be lockable.").is_empty());
}

#[tokio::test]
async fn collaborator_failure_surfaces_unmodified() {
	let credential = StaticCredential::new();
	let command = ClusterCommand::new("rg-1", "cluster-1", "kubectl get nodes");
	let err = run_cluster_command(&credential, &FailingClient, &command)
		.await
		.expect_err("A failing collaborator must surface its error.");

	assert!(matches!(err, Error::Command { .. }));
}
