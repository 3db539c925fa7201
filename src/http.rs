//! Transport primitives for authority token exchanges.
//!
//! [`TokenHttpClient`] is the crate's only dependency on an HTTP stack. Implementations
//! hand out short-lived [`AsyncHttpClient`] handles tied to a [`StatusSlot`], so exchange
//! failures can be classified with the HTTP status of the response that produced them.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// Abstraction over HTTP transports capable of executing token exchanges.
///
/// Callers provide an implementation (typically behind `Arc<T>` where `T:
/// TokenHttpClient`) and the exchange requests a short-lived handle per attempt. Handles
/// must own whatever state their request futures need so those futures remain `Send` for
/// the lifetime of the in-flight exchange.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`StatusSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records response statuses in `slot`.
	///
	/// Implementations must call [`StatusSlot::take`] before submitting the HTTP request
	/// so stale statuses never leak across attempts, and [`StatusSlot::store`] as soon as
	/// a response status is known.
	fn with_status(&self, slot: StatusSlot) -> Self::Handle;
}

/// Thread-safe slot capturing the HTTP status of the most recent exchange response.
#[derive(Clone, Debug, Default)]
pub struct StatusSlot(Arc<Mutex<Option<u16>>>);
impl StatusSlot {
	/// Stores the status for the current request.
	pub fn store(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	/// Returns the captured status, if any, consuming it from the slot.
	pub fn take(&self) -> Option<u16> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Token requests should not follow redirects; configure any custom [`ReqwestClient`]
/// accordingly, because the exchange passes this client straight into the `oauth2` crate.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

#[cfg(feature = "reqwest")]
struct StatusHttpClient {
	client: ReqwestClient,
	slot: StatusSlot,
}

#[cfg(feature = "reqwest")]
/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[derive(Clone)]
pub struct StatusHandle(Arc<StatusHttpClient>);
#[cfg(feature = "reqwest")]
impl StatusHandle {
	fn new(client: ReqwestClient, slot: StatusSlot) -> Self {
		Self(Arc::new(StatusHttpClient { client, slot }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for StatusHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(status.as_u16());

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = StatusHandle;
	type TransportError = ReqwestError;

	fn with_status(&self, slot: StatusSlot) -> Self::Handle {
		StatusHandle::new(self.0.clone(), slot)
	}
}
