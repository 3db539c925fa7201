//! Workload identity federated token credential for Azure—lock-guarded caching, lazy
//! refresh, and AKS run-command token plumbing.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod command;
pub mod credential;
pub mod env;
pub mod error;
pub mod http;
pub mod obs;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		credential::WorkloadIdentityCredential,
		env::{self, VarSource},
		http::ReqwestHttpClient,
	};

	/// Tenant identifier shared by test fixtures.
	pub const TEST_TENANT_ID: &str = "test-tenant";
	/// Client identifier shared by test fixtures.
	pub const TEST_CLIENT_ID: &str = "test-client";

	/// Token endpoint path derived from [`TEST_TENANT_ID`]; mock authorities should expect
	/// requests here.
	pub fn federation_token_path() -> String {
		format!("/{TEST_TENANT_ID}/oauth2/token")
	}

	/// Builds a variable map describing a complete workload identity environment.
	pub fn federation_vars(authority_host: &str, token_file: &Path) -> HashMap<String, String> {
		HashMap::from_iter([
			(env::AZURE_TENANT_ID.to_owned(), TEST_TENANT_ID.to_owned()),
			(env::AZURE_CLIENT_ID.to_owned(), TEST_CLIENT_ID.to_owned()),
			(env::AZURE_FEDERATED_TOKEN_FILE.to_owned(), token_file.display().to_string()),
			(env::AZURE_AUTHORITY_HOST.to_owned(), authority_host.to_owned()),
		])
	}

	/// Constructs a [`WorkloadIdentityCredential`] backed by the crate's default reqwest
	/// transport, configured from [`federation_vars`].
	pub fn build_test_credential(
		authority_host: &str,
		token_file: &Path,
	) -> WorkloadIdentityCredential<ReqwestHttpClient> {
		let vars = VarSource::from_map(federation_vars(authority_host, token_file));

		WorkloadIdentityCredential::from_vars(&vars, ReqwestHttpClient::default())
			.expect("Test credential should build from a complete variable map.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tempfile as _};
