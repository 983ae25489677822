//! Cancellable authentication-status polling.
//!
//! A [`StatusPoller`] owns both the repeat timer and the deadline timer of a
//! single attempt and guarantees that exactly one terminal outcome is
//! delivered, unless the attempt is cancelled first, in which case none is.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cadence and deadline of one polling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	pub interval: Duration,
	pub timeout: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(2_000),
			timeout: Duration::from_secs(300),
		}
	}
}

/// Terminal result of a polling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
	Authenticated,
	TimedOut,
	/// The check reported a non-transient error.
	Failed(String),
}

/// Error returned by a status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
	/// Counts as "not yet authenticated"; polling continues.
	Transient(String),
	/// Ends the attempt with [`PollOutcome::Failed`].
	Fatal(String),
}

type Callback = Box<dyn FnOnce(PollOutcome) + Send>;

/// Starts polling attempts.
pub struct StatusPoller;

impl StatusPoller {
	/// Spawns a polling task that calls `check` every `config.interval`,
	/// starting one interval after the call, until it returns `Ok(true)`,
	/// returns [`CheckError::Fatal`], or `config.timeout` elapses.
	///
	/// `on_outcome` runs at most once, on the polling task. Must be called
	/// from within a tokio runtime.
	pub fn start<F, Fut, C>(config: PollConfig, check: F, on_outcome: C) -> PollHandle
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Result<bool, CheckError>> + Send + 'static,
		C: FnOnce(PollOutcome) + Send + 'static,
	{
		let token = CancellationToken::new();
		let slot: Arc<Mutex<Option<Callback>>> = Arc::new(Mutex::new(Some(Box::new(on_outcome))));
		let checks = Arc::new(AtomicU32::new(0));
		let deadline = Instant::now() + config.timeout;

		let task = tokio::spawn({
			let token = token.clone();
			let slot = Arc::clone(&slot);
			let checks = Arc::clone(&checks);
			async move {
				let outcome = tokio::select! {
					biased;
					_ = token.cancelled() => return,
					_ = tokio::time::sleep_until(deadline) => PollOutcome::TimedOut,
					outcome = poll_until_resolved(check, config.interval, &checks) => outcome,
				};

				if token.is_cancelled() {
					return;
				}
				debug!(target = "fi.poll", ?outcome, checks = checks.load(Ordering::Relaxed), "poll attempt resolved");
				deliver(&slot, outcome);
			}
		});

		PollHandle {
			token,
			slot,
			checks,
			abort: task.abort_handle(),
		}
	}
}

async fn poll_until_resolved<F, Fut>(mut check: F, interval: Duration, checks: &AtomicU32) -> PollOutcome
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<bool, CheckError>>,
{
	let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;
		let attempt = checks.fetch_add(1, Ordering::Relaxed) + 1;

		match check().await {
			Ok(true) => return PollOutcome::Authenticated,
			Ok(false) => debug!(target = "fi.poll", attempt, "not yet authenticated"),
			Err(CheckError::Transient(err)) => {
				debug!(target = "fi.poll", attempt, error = %err, "status check failed; will retry");
			}
			Err(CheckError::Fatal(err)) => {
				warn!(target = "fi.poll", attempt, error = %err, "status check failed permanently");
				return PollOutcome::Failed(err);
			}
		}
	}
}

fn deliver(slot: &Mutex<Option<Callback>>, outcome: PollOutcome) {
	let callback = slot.lock().take();
	if let Some(callback) = callback {
		callback(outcome);
	}
}

/// Handle to a running polling attempt.
///
/// Clones refer to the same attempt; cancelling through any of them stops it.
#[derive(Clone)]
pub struct PollHandle {
	token: CancellationToken,
	slot: Arc<Mutex<Option<Callback>>>,
	checks: Arc<AtomicU32>,
	abort: AbortHandle,
}

impl PollHandle {
	/// Stops the attempt. No callback fires after this returns.
	///
	/// Idempotent, and safe to call from inside the outcome callback.
	pub fn cancel(&self) {
		drop(self.slot.lock().take());
		self.token.cancel();
		self.abort.abort();
	}

	/// True until the outcome has been delivered or the attempt cancelled.
	pub fn is_active(&self) -> bool {
		self.slot.lock().is_some()
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Number of status checks started so far.
	pub fn checks(&self) -> u32 {
		self.checks.load(Ordering::Relaxed)
	}
}

impl std::fmt::Debug for PollHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PollHandle")
			.field("active", &self.is_active())
			.field("cancelled", &self.is_cancelled())
			.field("checks", &self.checks())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;

	use tokio::sync::mpsc;

	use super::*;

	const INTERVAL: Duration = Duration::from_millis(2_000);

	fn config() -> PollConfig {
		PollConfig::default()
	}

	/// Check function answering from a script, then `fallback` forever.
	fn scripted(script: Vec<Result<bool, CheckError>>, fallback: Result<bool, CheckError>) -> impl FnMut() -> std::future::Ready<Result<bool, CheckError>> + Send + 'static {
		let mut script: VecDeque<_> = script.into();
		move || std::future::ready(script.pop_front().unwrap_or_else(|| fallback.clone()))
	}

	fn collect() -> (impl FnOnce(PollOutcome) + Send + 'static, mpsc::UnboundedReceiver<PollOutcome>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(move |outcome| drop(tx.send(outcome)), rx)
	}

	#[tokio::test(start_paused = true)]
	async fn resolves_authenticated_on_third_check() {
		let (cb, mut rx) = collect();
		let started = Instant::now();
		let handle = StatusPoller::start(config(), scripted(vec![Ok(false), Ok(false)], Ok(true)), cb);

		assert_eq!(rx.recv().await, Some(PollOutcome::Authenticated));
		assert_eq!(handle.checks(), 3);
		assert_eq!(started.elapsed(), INTERVAL * 3);
		assert!(!handle.is_active());
		assert_eq!(rx.recv().await, None, "exactly one outcome");
	}

	#[tokio::test(start_paused = true)]
	async fn times_out_on_wall_clock_deadline() {
		let (cb, mut rx) = collect();
		let started = Instant::now();
		let handle = StatusPoller::start(config(), scripted(vec![], Ok(false)), cb);

		assert_eq!(rx.recv().await, Some(PollOutcome::TimedOut));
		assert_eq!(started.elapsed(), Duration::from_secs(300));
		assert!(handle.checks() >= 149 && handle.checks() <= 151, "checks = {}", handle.checks());
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_holds_while_a_check_hangs() {
		let (cb, mut rx) = collect();
		let started = Instant::now();
		let _handle = StatusPoller::start(config(), std::future::pending::<Result<bool, CheckError>>, cb);

		assert_eq!(rx.recv().await, Some(PollOutcome::TimedOut));
		assert_eq!(started.elapsed(), Duration::from_secs(300));
	}

	#[tokio::test(start_paused = true)]
	async fn transient_errors_keep_polling() {
		let (cb, mut rx) = collect();
		let script = vec![
			Err(CheckError::Transient("connection refused".into())),
			Err(CheckError::Transient("502".into())),
			Ok(false),
		];
		let handle = StatusPoller::start(config(), scripted(script, Ok(true)), cb);

		assert_eq!(rx.recv().await, Some(PollOutcome::Authenticated));
		assert_eq!(handle.checks(), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn fatal_error_fails_the_attempt() {
		let (cb, mut rx) = collect();
		let handle = StatusPoller::start(config(), scripted(vec![Ok(false), Err(CheckError::Fatal("session not found".into()))], Ok(true)), cb);

		assert_eq!(rx.recv().await, Some(PollOutcome::Failed("session not found".into())));
		assert_eq!(handle.checks(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_immediately_after_start_is_silent() {
		let (cb, mut rx) = collect();
		let handle = StatusPoller::start(config(), scripted(vec![], Ok(true)), cb);
		handle.cancel();

		tokio::time::sleep(INTERVAL * 2).await;
		assert!(rx.try_recv().is_err());
		assert_eq!(handle.checks(), 0);
		assert!(!handle.is_active());
		assert!(handle.is_cancelled());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_is_idempotent() {
		let (cb, mut rx) = collect();
		let handle = StatusPoller::start(config(), scripted(vec![], Ok(false)), cb);
		handle.cancel();
		handle.cancel();
		handle.clone().cancel();

		tokio::time::sleep(Duration::from_secs(301)).await;
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_during_in_flight_check_suppresses_callback() {
		let (cb, mut rx) = collect();
		let check = || async {
			tokio::time::sleep(Duration::from_millis(500)).await;
			Ok::<bool, CheckError>(true)
		};
		let handle = StatusPoller::start(config(), check, cb);

		tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
		assert_eq!(handle.checks(), 1, "check should be in flight");
		handle.cancel();

		tokio::time::sleep(INTERVAL * 2).await;
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_from_inside_callback_is_safe() {
		let shared: Arc<Mutex<Option<PollHandle>>> = Arc::new(Mutex::new(None));
		let (tx, mut rx) = mpsc::unbounded_channel();
		let cb = {
			let shared = Arc::clone(&shared);
			move |outcome| {
				if let Some(handle) = shared.lock().as_ref() {
					handle.cancel();
				}
				let _ = tx.send(outcome);
			}
		};

		let handle = StatusPoller::start(config(), scripted(vec![Ok(false)], Ok(true)), cb);
		*shared.lock() = Some(handle.clone());

		assert_eq!(rx.recv().await, Some(PollOutcome::Authenticated));
		assert!(handle.is_cancelled());
		assert!(!handle.is_active());
	}
}
