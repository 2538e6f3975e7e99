//! Single-flight token refresh with an ordered replay queue.
//!
//! The first request that observes an expired token flips the client into
//! [`RefreshPhase::Refreshing`] and creates the shared refresh future; every request expiring
//! while it is outstanding joins the queue and polls the same future. Any surviving waiter
//! drives the refresh to completion, so dropping one caller never cancels it for the others.
//! When the call settles, the queue is drained in arrival order: on success each entry is
//! re-dispatched with the new bearer and polled once before the next one, on failure each
//! entry receives the same [`Error::RefreshFailed`] cause and the session is signed out.
//! Checking the phase and enqueueing happen under one lock, so a request either lands in the
//! current batch or starts the next one.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::task::Poll;
// crates.io
use futures::{
	FutureExt,
	channel::oneshot,
	future::{self, BoxFuture, Shared},
};
// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenBody, SessionTokens},
	client::{ApiClient, SignOutReason},
	http::{ApiHttpClient, ApiRequest, Method, TransportFuture},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::StoreKey,
};

type Completion = oneshot::Sender<Result<TransportFuture>>;
type SharedRefresh = Shared<BoxFuture<'static, ()>>;

/// Whether a token refresh is outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshPhase {
	/// No refresh in flight.
	Idle,
	/// A refresh call is outstanding and expired requests are being queued.
	Refreshing,
}

/// Request waiting for the outstanding refresh to settle.
struct PendingRequest {
	request: ApiRequest,
	completion: Completion,
}

/// Requests and the settle outcome handed back when a batch closes.
type SettledBatch = (Vec<PendingRequest>, Option<SharedRefresh>);

/// Outstanding refresh plus the requests queued behind it.
#[derive(Default)]
pub(crate) struct RefreshQueue {
	in_flight: Option<SharedRefresh>,
	generation: u64,
	waiters: usize,
	pending: Vec<PendingRequest>,
}
impl RefreshQueue {
	/// Queues a request behind the outstanding refresh, creating one with `start` when idle.
	fn join(
		&mut self,
		pending: PendingRequest,
		start: impl FnOnce() -> SharedRefresh,
	) -> (SharedRefresh, u64) {
		self.pending.push(pending);
		self.waiters += 1;

		let refresh = match &self.in_flight {
			Some(refresh) => refresh.clone(),
			None => {
				let refresh = start();

				self.generation += 1;
				self.in_flight = Some(refresh.clone());

				refresh
			},
		};

		(refresh, self.generation)
	}

	/// Closes the current batch, returning it in arrival order.
	fn settle(&mut self) -> SettledBatch {
		self.waiters = 0;

		(std::mem::take(&mut self.pending), self.in_flight.take())
	}

	/// Removes one waiter of `generation`; the batch is abandoned once none is left.
	fn leave(&mut self, generation: u64) -> Option<SettledBatch> {
		if self.in_flight.is_none() || self.generation != generation {
			return None;
		}

		self.waiters = self.waiters.saturating_sub(1);

		if self.waiters == 0 { Some(self.settle()) } else { None }
	}
}

/// Registration of one caller on a refresh batch.
struct Waiter<'a> {
	queue: &'a Mutex<RefreshQueue>,
	generation: u64,
}
impl Drop for Waiter<'_> {
	fn drop(&mut self) {
		let abandoned = self.queue.lock().leave(self.generation);

		// The refresh future is dropped here, outside the lock.
		if let Some((batch, _refresh)) = abandoned {
			for pending in batch {
				let _ = pending.completion.send(Err(Error::RefreshAbandoned));
			}
		}
	}
}

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Current refresh state.
	pub fn refresh_phase(&self) -> RefreshPhase {
		if self.refresh.lock().in_flight.is_some() {
			RefreshPhase::Refreshing
		} else {
			RefreshPhase::Idle
		}
	}

	/// Number of requests waiting on the outstanding refresh.
	pub fn queued_requests(&self) -> usize {
		self.refresh.lock().pending.len()
	}

	/// Queues `request` behind the refresh (starting one if idle) and resolves with its
	/// already-dispatched replay.
	pub(crate) async fn enqueue_for_refresh(&self, request: ApiRequest) -> Result<TransportFuture> {
		let (completion, settled) = oneshot::channel();
		let (refresh, generation) = self
			.refresh
			.lock()
			.join(PendingRequest { request, completion }, || self.start_refresh());
		let _waiter = Waiter { queue: self.refresh.as_ref(), generation };

		// The refresh settles every queued completion before it resolves.
		refresh.await;

		settled.await.unwrap_or(Err(Error::RefreshAbandoned))
	}

	fn start_refresh(&self) -> SharedRefresh {
		let client = self.clone();

		async move { client.run_refresh().await }.boxed().shared()
	}

	async fn run_refresh(&self) {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "run_refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		match span.instrument(self.refresh_tokens()).await {
			Ok(tokens) => {
				self.refresh_metrics.record_success();
				obs::record_op_outcome(KIND, OpOutcome::Success);

				let (batch, _refresh) = self.refresh.lock().settle();

				obs::trace_refresh_settled(true, batch.len());
				obs::record_refresh_settled(true, batch.len());

				for PendingRequest { request, completion } in batch {
					let mut replay =
						self.dispatch(request.with_bearer(Some(tokens.access_token.clone())));
					// Start sending before the next replay is dispatched.
					let replay: TransportFuture = match futures::poll!(&mut replay) {
						Poll::Ready(outcome) => Box::pin(future::ready(outcome)),
						Poll::Pending => replay,
					};

					self.refresh_metrics.record_replay();

					let _ = completion.send(Ok(replay));
				}
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				obs::record_op_outcome(KIND, OpOutcome::Failure);
				self.clear_session(SignOutReason::RefreshFailed).await;

				let cause = Arc::new(err);
				let (batch, _refresh) = self.refresh.lock().settle();

				obs::trace_refresh_settled(false, batch.len());
				obs::record_refresh_settled(false, batch.len());

				for PendingRequest { completion, .. } in batch {
					let _ = completion.send(Err(Error::RefreshFailed(cause.clone())));
				}
			},
		}
	}

	/// Exchanges the stored refresh token, persists the new pair, and swaps the bearer.
	async fn refresh_tokens(&self) -> Result<SessionTokens> {
		let _credentials = self.credentials.lock().await;
		let refresh_key = self.config.store_key(StoreKey::RefreshToken);
		let refresh_token =
			self.store.get(&refresh_key).await?.ok_or(Error::MissingRefreshToken)?;
		let body = serde_json::to_value(RefreshTokenBody { refresh_token: &refresh_token })
			.map_err(Error::Encode)?;
		let request = ApiRequest::new(Method::Post, self.config.endpoint(&self.config.refresh_path)?)
			.with_body(body);
		let response = self.dispatch(request).await?;

		if !response.is_success() {
			return Err(response.into_error());
		}

		let tokens = response.json::<SessionTokens>()?;

		self.store
			.set(&self.config.store_key(StoreKey::AccessToken), tokens.access_token.expose().into())
			.await?;
		self.store.set(&refresh_key, tokens.refresh_token.expose().into()).await?;
		self.set_bearer_token(Some(tokens.access_token.clone()));

		Ok(tokens)
	}
}
