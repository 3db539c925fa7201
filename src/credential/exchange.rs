//! Token exchanges against the authority endpoint, shared by both credentials.
//!
//! Both grants ride the OAuth 2.0 `client_credentials` flow: the federated variant
//! attaches a JWT-bearer client assertion, the fallback posts a client secret. Either
//! way the authority's v1 endpoint may report expiry as an absolute `expires_on` unix
//! timestamp, a relative `expires_in`, or both; the resulting instant is always UTC.

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, RequestTokenError, Scope, StandardErrorResponse, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponseType, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	credential::AccessToken,
	error::ExchangeError,
	http::{StatusSlot, TokenHttpClient},
};

/// Client assertion type of the JWT-bearer federated exchange.
const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Extra response fields reported by the authority's v1 token endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct AuthorityTokenFields {
	#[serde(default)]
	expires_on: Option<ExpiresOn>,
}
impl ExtraTokenFields for AuthorityTokenFields {}

/// `expires_on` arrives as a decimal string on the v1 endpoint; tolerate a bare number
/// too.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum ExpiresOn {
	Seconds(i64),
	Text(String),
}

type AuthorityTokenResponse = StandardTokenResponse<AuthorityTokenFields, BasicTokenType>;
type AuthorityErrorResponse = StandardErrorResponse<BasicErrorResponseType>;
type AuthorityClient = Client<
	AuthorityErrorResponse,
	AuthorityTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type AuthorityRequestTokenError<E> =
	RequestTokenError<HttpClientError<E>, AuthorityErrorResponse>;

/// Exchanges a platform-issued assertion for an access token (JWT-bearer grant).
pub(crate) async fn assertion_grant<C>(
	client_id: &str,
	authority: &Url,
	http_client: &C,
	assertion: &str,
	scopes: &[&str],
) -> Result<AccessToken>
where
	C: ?Sized + TokenHttpClient,
{
	let oauth_client = authority_client(client_id, authority);
	let slot = StatusSlot::default();
	let handle = http_client.with_status(slot.clone());
	let mut request = oauth_client
		.exchange_client_credentials()
		.add_extra_param("client_assertion_type", JWT_BEARER_ASSERTION_TYPE)
		.add_extra_param("client_assertion", assertion);

	for scope in scopes {
		request = request.add_scope(Scope::new((*scope).to_owned()));
	}

	let response = request
		.request_async(&handle)
		.await
		.map_err(|err| map_request_error(err, slot.take()))?;

	token_from_response(response)
}

/// Exchanges a client secret for an access token (plain `client_credentials` grant).
pub(crate) async fn client_secret_grant<C>(
	client_id: &str,
	authority: &Url,
	http_client: &C,
	client_secret: &str,
	scopes: &[&str],
) -> Result<AccessToken>
where
	C: ?Sized + TokenHttpClient,
{
	let oauth_client = authority_client(client_id, authority)
		.set_client_secret(ClientSecret::new(client_secret.to_owned()));
	let slot = StatusSlot::default();
	let handle = http_client.with_status(slot.clone());
	let mut request = oauth_client.exchange_client_credentials();

	for scope in scopes {
		request = request.add_scope(Scope::new((*scope).to_owned()));
	}

	let response = request
		.request_async(&handle)
		.await
		.map_err(|err| map_request_error(err, slot.take()))?;

	token_from_response(response)
}

fn authority_client(client_id: &str, authority: &Url) -> AuthorityClient {
	// The authority endpoint takes credentials in the request body, never via Basic auth.
	Client::new(ClientId::new(client_id.to_owned()))
		.set_auth_type(AuthType::RequestBody)
		.set_token_uri(TokenUrl::from_url(authority.clone()))
}

fn token_from_response(response: AuthorityTokenResponse) -> Result<AccessToken> {
	let expires_at = match response.extra_fields().expires_on.as_ref() {
		Some(raw) => expiry_from_unix(raw)?,
		None => {
			let expires_in = response.expires_in().ok_or(ExchangeError::MissingExpiry)?;
			let seconds = i64::try_from(expires_in.as_secs()).map_err(|_| {
				ExchangeError::InvalidExpiry { raw: expires_in.as_secs().to_string() }
			})?;

			OffsetDateTime::now_utc() + Duration::seconds(seconds)
		},
	};

	Ok(AccessToken { secret: response.access_token().secret().clone(), expires_at })
}

fn expiry_from_unix(raw: &ExpiresOn) -> Result<OffsetDateTime, ExchangeError> {
	let seconds = match raw {
		ExpiresOn::Seconds(value) => *value,
		ExpiresOn::Text(text) => text
			.trim()
			.parse::<i64>()
			.map_err(|_| ExchangeError::InvalidExpiry { raw: text.clone() })?,
	};

	// Unix timestamps carry no zone; the resulting instant is UTC by construction.
	OffsetDateTime::from_unix_timestamp(seconds)
		.map_err(|_| ExchangeError::InvalidExpiry { raw: seconds.to_string() })
}

fn map_request_error<E>(err: AuthorityRequestTokenError<E>, status: Option<u16>) -> ExchangeError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		RequestTokenError::ServerResponse(response) =>
			ExchangeError::Rejected { reason: describe_rejection(&response), status },
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(source, _body) =>
			ExchangeError::MalformedResponse { source, status },
		RequestTokenError::Other(message) => ExchangeError::Protocol { message },
	}
}

fn map_transport_error<E>(error: HttpClientError<E>) -> ExchangeError
where
	E: 'static + Send + Sync + StdError,
{
	match error {
		HttpClientError::Reqwest(inner) => ExchangeError::Network { source: inner },
		HttpClientError::Http(inner) => ExchangeError::Protocol { message: inner.to_string() },
		HttpClientError::Io(inner) => ExchangeError::Io(inner),
		HttpClientError::Other(message) => ExchangeError::Protocol { message: message.to_owned() },
		_ => ExchangeError::Protocol { message: "Unknown transport failure".into() },
	}
}

fn describe_rejection(response: &AuthorityErrorResponse) -> String {
	let code = response.error().as_ref();

	match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.to_owned(),
	}
}
