//! Client secret fallback credential.
//!
//! Used when the federation flag is absent: the plain `client_credentials` grant,
//! authenticating with a secret posted in the request body. Shares the caching and
//! locking contract of the workload identity credential.

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

/// Immutable configuration for [`ClientSecretCredential`].
#[derive(Clone)]
pub struct ClientSecretConfig {
	/// Directory (tenant) identifier.
	pub tenant_id: String,
	/// Application (client) identifier presented during the exchange.
	pub client_id: String,
	/// Token endpoint derived from the authority host and tenant.
	pub authority: Url,
	client_secret: String,
}
impl ClientSecretConfig {
	/// Creates a configuration from explicit values.
	pub fn new(
		tenant_id: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		authority: Url,
	) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			client_id: client_id.into(),
			authority,
			client_secret: client_secret.into(),
		}
	}

	/// Reads the required variables, naming the first missing one in the fixed check
	/// order: tenant id, client id, client secret. The authority host falls back to
	/// [`env::DEFAULT_AUTHORITY_HOST`] when absent.
	pub fn from_vars(vars: &VarSource) -> Result<Self, ConfigError> {
		let tenant_id = vars.require(env::AZURE_TENANT_ID)?;
		let client_id = vars.require(env::AZURE_CLIENT_ID)?;
		let client_secret = vars.require(env::AZURE_CLIENT_SECRET)?;
		let authority_host = vars
			.get(env::AZURE_AUTHORITY_HOST)
			.unwrap_or_else(|| env::DEFAULT_AUTHORITY_HOST.to_owned());
		let authority = derive_authority(&authority_host, &tenant_id)?;

		Ok(Self { tenant_id, client_id, authority, client_secret })
	}

	pub(crate) fn client_secret(&self) -> &str {
		&self.client_secret
	}
}
impl Debug for ClientSecretConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretConfig")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("authority", &self.authority)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

/// Credential performing the `client_credentials` grant with a client secret.
pub struct ClientSecretCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	config: ClientSecretConfig,
	http_client: Arc<C>,
	cache: TokenCache,
}
impl<C> ClientSecretCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds a credential from an explicit configuration and transport.
	pub fn new(config: ClientSecretConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self { config, http_client: http_client.into(), cache: TokenCache::new(MIN_TOKEN_LIFETIME) }
	}

	/// Builds a credential from the provided variables and transport.
	pub fn from_vars(
		vars: &VarSource,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		Ok(Self::new(ClientSecretConfig::from_vars(vars)?, http_client))
	}

	/// Returns the immutable configuration.
	pub fn config(&self) -> &ClientSecretConfig {
		&self.config
	}

	async fn refresh(&self, scopes: &[&str]) -> Result<AccessToken> {
		exchange::client_secret_grant(
			&self.config.client_id,
			&self.config.authority,
			self.http_client.as_ref(),
			self.config.client_secret(),
			scopes,
		)
		.await
	}
}
impl<C> TokenCredential for ClientSecretCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn acquire_token<'a>(&'a self, scopes: &'a [&'a str]) -> CredentialFuture<'a, AccessToken> {
		Box::pin(async move {
			self.cache
				.acquire_or_refresh(CredentialKind::ClientSecret, || self.refresh(scopes))
				.await
		})
	}
}
impl<C> Debug for ClientSecretCredential<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential").field("config", &self.config).finish()
	}
}
