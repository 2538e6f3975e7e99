// self
use crate::{_prelude::*, client::SignOutReason, obs::OpKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("asahi_api.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
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

/// Logs how a refresh settled and how many queued requests it released.
pub fn trace_refresh_settled(succeeded: bool, queued: usize) {
	#[cfg(feature = "tracing")]
	{
		if succeeded {
			tracing::debug!(queued, "token refresh succeeded; replaying queued requests");
		} else {
			tracing::warn!(queued, "token refresh failed; rejecting queued requests");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (succeeded, queued);
	}
}

/// Logs a store failure that sign-out deliberately swallows.
pub fn trace_store_failure(key: &str, err: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(key, error = %err, "ignoring session store failure during sign-out");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, err);
	}
}

/// Logs a completed sign-out.
pub fn trace_sign_out(reason: SignOutReason) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(reason = reason.as_str(), "session signed out");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}
