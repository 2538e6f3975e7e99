// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"asahi_api_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how a refresh batch settled and how many queued requests it released.
///
/// `asahi_api_refresh_settled_total{outcome}` counts batches; `asahi_api_refresh_queued_total`
/// accumulates the requests that were replayed (`outcome="success"`) or rejected
/// (`outcome="failure"`).
pub fn record_refresh_settled(succeeded: bool, queued: usize) {
	#[cfg(feature = "metrics")]
	{
		let outcome = if succeeded { OpOutcome::Success } else { OpOutcome::Failure };

		metrics::counter!("asahi_api_refresh_settled_total", "outcome" => outcome.as_str())
			.increment(1);
		metrics::counter!("asahi_api_refresh_queued_total", "outcome" => outcome.as_str())
			.increment(queued as u64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (succeeded, queued);
	}
}
