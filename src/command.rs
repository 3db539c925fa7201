//! Typed model and token plumbing for running commands against a managed cluster.
//!
//! The long-running operation itself (submit the command, poll until a terminal state)
//! belongs to the [`ClusterCommandClient`] collaborator. This module only shapes the
//! request/outcome model and supplies the cluster-scoped access token, which is the sole
//! interaction the credential layer has with command execution.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, credential::TokenCredential};

/// OAuth scope identifying the AKS command-execution audience.
pub const CLUSTER_COMMAND_SCOPE: &str = "6dae42f8-4368-4678-94ff-3960e28e3630";

/// Base64-encoded zip payload carrying the files a command needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext(String);
impl CommandContext {
	/// Encodes a raw zip archive.
	pub fn from_zip_bytes(bytes: impl AsRef<[u8]>) -> Self {
		Self(STANDARD.encode(bytes))
	}

	/// Accepts an already-encoded payload after checking that it decodes.
	pub fn from_base64(encoded: impl Into<String>) -> Result<Self, CommandContextError> {
		let encoded = encoded.into();

		STANDARD.decode(&encoded).map_err(|source| CommandContextError::InvalidBase64 { source })?;

		Ok(Self(encoded))
	}

	/// Returns the encoded payload.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Error produced when validating a caller-supplied command context.
#[derive(Debug, ThisError)]
pub enum CommandContextError {
	/// Payload is not valid base64.
	#[error("Command context is not valid base64.")]
	InvalidBase64 {
		/// Underlying decode failure.
		#[source]
		source: base64::DecodeError,
	},
}

/// Command to run against a managed cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCommand {
	/// Resource group containing the cluster.
	pub resource_group: String,
	/// Name of the managed cluster.
	pub cluster_name: String,
	/// Command text to execute.
	pub command: String,
	/// Optional file bundle required by the command.
	pub context: Option<CommandContext>,
}
impl ClusterCommand {
	/// Creates a command without a context bundle.
	pub fn new(
		resource_group: impl Into<String>,
		cluster_name: impl Into<String>,
		command: impl Into<String>,
	) -> Self {
		Self {
			resource_group: resource_group.into(),
			cluster_name: cluster_name.into(),
			command: command.into(),
			context: None,
		}
	}

	/// Attaches a context bundle.
	pub fn with_context(mut self, context: CommandContext) -> Self {
		self.context = Some(context);

		self
	}
}

/// Terminal result of a cluster command run.
///
/// Every field is optional; the service omits fields freely depending on how the
/// operation terminated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
	/// Identifier assigned to the run.
	pub id: Option<String>,
	/// Exit code of the command.
	pub exit_code: Option<i64>,
	/// Captured log output.
	pub output: Option<String>,
	/// Provisioning state at termination.
	pub provisioning_state: Option<String>,
	/// Explanation when the provisioning state reports a failure.
	pub provisioning_reason: Option<String>,
	/// Start instant (UTC).
	pub started_at: Option<OffsetDateTime>,
	/// Finish instant (UTC).
	pub finished_at: Option<OffsetDateTime>,
}

/// Boxed future returned by [`ClusterCommandClient::run_to_completion`].
pub type CommandFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Collaborator that submits a command and polls the long-running operation to a
/// terminal state.
pub trait ClusterCommandClient
where
	Self: Send + Sync,
{
	/// Runs `command` authenticated by `cluster_token` and resolves once the operation
	/// reaches a terminal state.
	fn run_to_completion<'a>(
		&'a self,
		command: &'a ClusterCommand,
		cluster_token: &'a str,
	) -> CommandFuture<'a, CommandOutcome>;
}

/// Acquires a cluster-scoped token and delegates the run to the collaborator.
///
/// Credential failures short-circuit before the collaborator is invoked; collaborator
/// failures surface unmodified.
pub async fn run_cluster_command(
	credential: &dyn TokenCredential,
	client: &dyn ClusterCommandClient,
	command: &ClusterCommand,
) -> Result<CommandOutcome> {
	let token = credential.acquire_token(&[CLUSTER_COMMAND_SCOPE]).await?;

	client.run_to_completion(command, &token.secret).await
}
