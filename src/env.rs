//! Environment variable names and snapshot-style configuration access.
//!
//! Credentials capture everything they need while being constructed, so a [`VarSource`]
//! is only consulted at build time, never per acquisition.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Selects the workload identity credential and points at the rotating assertion file.
pub const AZURE_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
/// Directory (tenant) identifier used to derive the authority URL.
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Application (client) identifier presented to the authority.
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
/// Base URL of the token-issuing authority.
pub const AZURE_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
/// Client secret consumed by the fallback credential.
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";

/// Authority host assumed by the fallback credential when [`AZURE_AUTHORITY_HOST`] is
/// absent.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Read-only view over named configuration variables.
///
/// Empty values count as unset, matching how ambient Azure tooling treats its
/// environment.
#[derive(Clone)]
pub struct VarSource(Arc<Lookup>);
impl VarSource {
	/// Reads from the process environment.
	pub fn process_env() -> Self {
		Self(Arc::new(|name| env::var(name).ok()))
	}

	/// Reads from an explicit map; intended for tests and embedding hosts.
	pub fn from_map(vars: HashMap<String, String>) -> Self {
		Self(Arc::new(move |name| vars.get(name).cloned()))
	}

	/// Returns the value of `name` when present and non-empty.
	pub fn get(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|value| !value.is_empty())
	}

	/// Returns the value of `name` or a [`ConfigError`] naming the variable.
	pub fn require(&self, name: &'static str) -> Result<String, ConfigError> {
		self.get(name).ok_or(ConfigError::MissingVariable { name })
	}
}
impl Debug for VarSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("VarSource").field(&"..").finish()
	}
}
