//! Optional observability helpers for credential acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `workload_credential.acquire` with the
//!   `credential` (kind) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `workload_credential_acquire_total` counter for every
//!   attempt/cache-hit/refresh/failure, labeled by `credential` + `outcome`.
//!
//! Neither integration ever touches token or assertion material.

// self
use crate::_prelude::*;

/// Credential kinds observed during acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
	/// Workload identity federated credential.
	WorkloadIdentity,
	/// Client secret fallback credential.
	ClientSecret,
}
impl CredentialKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::WorkloadIdentity => "workload_identity",
			CredentialKind::ClientSecret => "client_secret",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to the acquire-or-refresh sequence.
	Attempt,
	/// Cached token served without I/O.
	CacheHit,
	/// Fresh token obtained from the authority.
	Refreshed,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::CacheHit => "cache_hit",
			AcquireOutcome::Refreshed => "refreshed",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an acquisition outcome via the global metrics recorder (when enabled).
pub fn record_acquire(kind: CredentialKind, outcome: AcquireOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"workload_credential_acquire_total",
			"credential" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAcquire<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAcquire<F> = F;

/// A span builder wrapped around each refresh attempt.
#[derive(Clone, Debug)]
pub struct AcquireSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AcquireSpan {
	/// Creates a new span tagged with the provided credential kind + stage.
	pub fn new(kind: CredentialKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("workload_credential.acquire", credential = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAcquire<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
