//! Workload identity federated credential.
//!
//! Workloads running in a cluster prove their identity with a platform-issued assertion
//! token that the platform rotates on disk. This credential re-reads that file on every
//! refresh, exchanges the assertion for an access token via the JWT-bearer
//! client-assertion grant, and caches the result until it falls within five minutes of
//! expiry. Refresh is entirely lazy; no background task exists.

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	credential::{
		AccessToken, CredentialFuture, MIN_TOKEN_LIFETIME, TokenCache, TokenCredential,
		derive_authority, exchange,
	},
	env::{self, VarSource},
	error::ConfigError,
	http::TokenHttpClient,
	obs::CredentialKind,
};

/// Immutable configuration for [`WorkloadIdentityCredential`].
#[derive(Clone, Debug)]
pub struct WorkloadIdentityConfig {
	/// Directory (tenant) identifier.
	pub tenant_id: String,
	/// Application (client) identifier presented during the exchange.
	pub client_id: String,
	/// Path of the rotating assertion token file.
	pub token_file: PathBuf,
	/// Token endpoint derived from the authority host and tenant.
	pub authority: Url,
}
impl WorkloadIdentityConfig {
	/// Reads the required variables, naming the first missing one in the fixed check
	/// order: tenant id, client id, token file path, authority host.
	pub fn from_vars(vars: &VarSource) -> Result<Self, ConfigError> {
		let tenant_id = vars.require(env::AZURE_TENANT_ID)?;
		let client_id = vars.require(env::AZURE_CLIENT_ID)?;
		let token_file = PathBuf::from(vars.require(env::AZURE_FEDERATED_TOKEN_FILE)?);
		let authority_host = vars.require(env::AZURE_AUTHORITY_HOST)?;
		let authority = derive_authority(&authority_host, &tenant_id)?;

		Ok(Self { tenant_id, client_id, token_file, authority })
	}
}

/// Federated credential exchanging a platform-issued assertion for an access token.
///
/// One exchange is in flight at most per instance: the whole acquire-or-refresh sequence
/// (cache check, file read, network exchange, cache update) runs under an exclusive
/// lock, so a caller pool sharing this credential serializes its refreshes.
pub struct WorkloadIdentityCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	config: WorkloadIdentityConfig,
	http_client: Arc<C>,
	cache: TokenCache,
}
impl<C> WorkloadIdentityCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds a credential from an explicit configuration and transport.
	pub fn new(config: WorkloadIdentityConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self { config, http_client: http_client.into(), cache: TokenCache::new(MIN_TOKEN_LIFETIME) }
	}

	/// Builds a credential from the provided variables and transport.
	pub fn from_vars(
		vars: &VarSource,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		Ok(Self::new(WorkloadIdentityConfig::from_vars(vars)?, http_client))
	}

	/// Returns the immutable configuration.
	pub fn config(&self) -> &WorkloadIdentityConfig {
		&self.config
	}

	fn read_assertion(&self) -> Result<String> {
		// Always re-read: the platform rotates the file underneath us.
		fs::read_to_string(&self.config.token_file).map_err(|source| Error::AssertionRead {
			path: self.config.token_file.clone(),
			source,
		})
	}

	async fn refresh(&self, scopes: &[&str]) -> Result<AccessToken> {
		let assertion = self.read_assertion()?;

		exchange::assertion_grant(
			&self.config.client_id,
			&self.config.authority,
			self.http_client.as_ref(),
			&assertion,
			scopes,
		)
		.await
	}
}
impl<C> TokenCredential for WorkloadIdentityCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn acquire_token<'a>(&'a self, scopes: &'a [&'a str]) -> CredentialFuture<'a, AccessToken> {
		Box::pin(async move {
			self.cache
				.acquire_or_refresh(CredentialKind::WorkloadIdentity, || self.refresh(scopes))
				.await
		})
	}
}
impl<C> Debug for WorkloadIdentityCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WorkloadIdentityCredential").field("config", &self.config).finish()
	}
}
#[cfg(feature = "reqwest")]
impl WorkloadIdentityCredential<crate::http::ReqwestHttpClient> {
	/// Builds a credential from the process environment using the default reqwest
	/// transport.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(&VarSource::process_env(), crate::http::ReqwestHttpClient::default())
	}
}
