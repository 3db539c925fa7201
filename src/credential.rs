//! Credential capability contract, the shared token cache, and the selection policy.

/// Client secret fallback credential.
pub mod client_secret;
/// Workload identity federated credential.
pub mod workload_identity;

pub(crate) mod exchange;

pub use client_secret::{ClientSecretConfig, ClientSecretCredential};
pub use workload_identity::{WorkloadIdentityConfig, WorkloadIdentityCredential};

// self
use crate::{
	_prelude::*,
	env::{self, VarSource},
	error::ConfigError,
	http::TokenHttpClient,
	obs::{self, AcquireOutcome, AcquireSpan, CredentialKind},
};

/// How long a cached token must remain valid for a cache hit to be served.
pub(crate) const MIN_TOKEN_LIFETIME: Duration = Duration::minutes(5);

/// Boxed future returned by [`TokenCredential::acquire_token`].
pub type CredentialFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Access token issued by the authority.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer token value; callers must avoid logging it.
	pub secret: String,
	/// Expiry instant, always UTC.
	pub expires_at: OffsetDateTime,
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Capability to acquire an access token for an ordered sequence of scopes.
///
/// Downstream code is indifferent to which concrete credential backs the value returned
/// by [`select_credential`]; the trait is the whole surface.
pub trait TokenCredential
where
	Self: Send + Sync + Debug,
{
	/// Returns a token that stays valid past the minimum-lifetime policy, refreshing it
	/// against the authority when the cached one does not.
	///
	/// Dropping the returned future cancels any in-flight file read or exchange.
	fn acquire_token<'a>(&'a self, scopes: &'a [&'a str]) -> CredentialFuture<'a, AccessToken>;
}

/// Lock-guarded cell holding the most recently issued token.
///
/// The lock is held for the entire acquire-or-refresh sequence, so one refresh in flight
/// serializes every other caller, including ones whose cached token is still valid.
pub(crate) struct TokenCache {
	cell: AsyncMutex<Option<AccessToken>>,
	min_lifetime: Duration,
}
impl TokenCache {
	pub(crate) fn new(min_lifetime: Duration) -> Self {
		Self { cell: AsyncMutex::new(None), min_lifetime }
	}

	/// Serves the cached token while it stays valid past `now + min_lifetime`; otherwise
	/// clears the cell, runs `refresh`, and stores the result.
	///
	/// The cell is cleared before refreshing, so a failed refresh never leaves a stale
	/// token behind; the next call re-attempts the full sequence from scratch.
	pub(crate) async fn acquire_or_refresh<F, Fut>(
		&self,
		kind: CredentialKind,
		refresh: F,
	) -> Result<AccessToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<AccessToken>>,
	{
		obs::record_acquire(kind, AcquireOutcome::Attempt);

		let mut cell = self.cell.lock().await;
		let cutoff = OffsetDateTime::now_utc() + self.min_lifetime;

		if let Some(current) = cell.as_ref().filter(|token| token.expires_at > cutoff) {
			obs::record_acquire(kind, AcquireOutcome::CacheHit);

			return Ok(current.clone());
		}

		*cell = None;

		let span = AcquireSpan::new(kind, "refresh");
		let token = match span.instrument(refresh()).await {
			Ok(token) => token,
			Err(err) => {
				obs::record_acquire(kind, AcquireOutcome::Failure);

				return Err(err);
			},
		};

		// A token the authority issued already expired is returned but never cached.
		if token.expires_at > OffsetDateTime::now_utc() {
			*cell = Some(token.clone());
		}

		obs::record_acquire(kind, AcquireOutcome::Refreshed);

		Ok(token)
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache").field("min_lifetime", &self.min_lifetime).finish()
	}
}

/// Derives the token endpoint from an authority host and tenant, exactly as the ambient
/// tooling does: plain concatenation, so the host carries its own trailing slash.
pub(crate) fn derive_authority(host: &str, tenant_id: &str) -> Result<Url, ConfigError> {
	let raw = format!("{host}{tenant_id}/oauth2/token");

	Url::parse(&raw).map_err(|source| ConfigError::InvalidAuthority { url: raw, source })
}

/// Selects the credential implementation for the provided variables.
///
/// A non-empty federation flag ([`env::AZURE_FEDERATED_TOKEN_FILE`]) selects the
/// workload identity credential; otherwise the client secret fallback is built. The
/// decision happens once; callers hold the result for the provider's lifetime.
pub fn select_credential<C>(
	vars: &VarSource,
	http_client: impl Into<Arc<C>>,
) -> Result<Arc<dyn TokenCredential>, ConfigError>
where
	C: TokenHttpClient,
{
	if vars.get(env::AZURE_FEDERATED_TOKEN_FILE).is_some() {
		Ok(Arc::new(WorkloadIdentityCredential::from_vars(vars, http_client)?))
	} else {
		Ok(Arc::new(ClientSecretCredential::from_vars(vars, http_client)?))
	}
}

#[cfg(feature = "reqwest")]
/// Selects a credential from the process environment using the default reqwest
/// transport.
pub fn default_credential() -> Result<Arc<dyn TokenCredential>, ConfigError> {
	select_credential(&VarSource::process_env(), crate::http::ReqwestHttpClient::default())
}
