//! Authentication handshake state machine.
//!
//! The orchestrator turns an "authentication required" answer into a full
//! handshake: fetch the surface URL, park the rejected operation, open the
//! surface, poll until the backend reports the session linked, then replay
//! the parked operation exactly once.
//!
//! Poll outcomes travel from the poller task over a channel and are applied
//! by [`AuthOrchestrator::next_resolution`]. Each attempt carries a
//! generation number so an outcome from a cancelled or superseded attempt is
//! never applied.

use std::collections::VecDeque;
use std::sync::Arc;

use fi_protocol::AuthStatusResponse;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use url::Url;

use super::events::{AuthEvent, AuthState, Notice};
use super::pending::{Admission, PendingOperation, PendingPolicy, PendingSlot};
use super::poller::{CheckError, PollConfig, PollHandle, PollOutcome, StatusPoller};
use crate::backend::Backend;
use crate::error::{FiError, Result};
use crate::operation::{Operation, OperationOutput};
use crate::surface::{Surface, SurfaceHandle, SurfaceLauncher};

const EVENT_CAPACITY: usize = 64;

/// What happened to a submitted operation.
#[derive(Debug)]
pub enum Submission {
	/// The backend accepted the operation.
	Completed(OperationOutput),
	/// Authentication is needed; the operation is parked for replay.
	AwaitingAuth(AuthPrompt),
	/// A handshake was already running and the operation was not kept.
	Discarded(Operation),
	/// A handshake was already running and the operation now waits in the
	/// slot, possibly displacing an earlier one.
	Queued { replaced: Option<Operation> },
}

/// Information for the person completing the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPrompt {
	pub auth_url: Url,
	pub surface_opened: bool,
	/// Set when the surface could not be opened.
	pub warning: Option<String>,
}

/// Result of replaying the parked operation.
#[derive(Debug)]
pub struct Replay {
	pub operation: Operation,
	pub result: Result<OperationOutput>,
}

/// How a handshake attempt ended.
#[derive(Debug)]
pub enum AuthResolution {
	Authenticated { replay: Option<Replay> },
	TimedOut { discarded: Option<Operation>, waited_secs: u64 },
	Failed { reason: String, discarded: Option<Operation> },
}

#[derive(Debug)]
struct PollEvent {
	attempt: u64,
	outcome: PollOutcome,
}

/// Drives the handshake for one session at a time.
pub struct AuthOrchestrator<B: Backend> {
	backend: Arc<B>,
	launcher: SurfaceLauncher<B>,
	poll_config: PollConfig,
	policy: PendingPolicy,
	state: AuthState,
	slot: PendingSlot,
	poll: Option<PollHandle>,
	surface: Option<SurfaceHandle>,
	attempt: u64,
	attempt_session: Option<String>,
	prompt: Option<AuthPrompt>,
	settled: VecDeque<AuthResolution>,
	poll_tx: mpsc::UnboundedSender<PollEvent>,
	poll_rx: mpsc::UnboundedReceiver<PollEvent>,
	events: broadcast::Sender<AuthEvent>,
}

impl<B: Backend> AuthOrchestrator<B> {
	pub fn new(backend: Arc<B>, surface: Arc<dyn Surface>, poll_config: PollConfig, policy: PendingPolicy) -> Self {
		let (poll_tx, poll_rx) = mpsc::unbounded_channel();
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			launcher: SurfaceLauncher::new(Arc::clone(&backend), surface),
			backend,
			poll_config,
			policy,
			state: AuthState::Unauthenticated,
			slot: PendingSlot::new(),
			poll: None,
			surface: None,
			attempt: 0,
			attempt_session: None,
			prompt: None,
			settled: VecDeque::new(),
			poll_tx,
			poll_rx,
			events,
		}
	}

	pub fn state(&self) -> AuthState {
		self.state
	}

	pub fn pending(&self) -> Option<&PendingOperation> {
		self.slot.peek()
	}

	pub fn is_polling(&self) -> bool {
		self.poll.as_ref().is_some_and(PollHandle::is_active)
	}

	pub fn poll_config(&self) -> PollConfig {
		self.poll_config
	}

	pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
		self.events.subscribe()
	}

	/// Adopts a status observed outside a polling attempt, such as the check
	/// made when a session is loaded. Ignored while a handshake is running.
	pub fn seed_from_status(&mut self, status: &AuthStatusResponse) {
		if self.state == AuthState::AwaitingExternalCompletion {
			return;
		}
		let next = if status.authenticated {
			AuthState::Authenticated
		} else {
			AuthState::Unauthenticated
		};
		self.set_state(next);
	}

	/// Issues `op`, starting a handshake if the backend asks for one.
	pub async fn execute(&mut self, session_id: &str, op: Operation) -> Result<Submission> {
		match self.backend.execute(session_id, &op).await {
			Ok(output) => Ok(Submission::Completed(output)),
			Err(FiError::AuthRequired) => {
				debug!(target = "fi.auth", %session_id, operation = %op.kind(), "backend requires authentication");
				self.on_auth_required(session_id, Some(op)).await
			}
			Err(err) => Err(err),
		}
	}

	/// Starts a handshake without a parked operation.
	pub async fn authenticate(&mut self, session_id: &str) -> Result<Submission> {
		self.on_auth_required(session_id, None).await
	}

	async fn on_auth_required(&mut self, session_id: &str, op: Option<Operation>) -> Result<Submission> {
		self.settle_delivered().await;
		let awaiting_this = self.state == AuthState::AwaitingExternalCompletion && self.attempt_session.as_deref() == Some(session_id);
		let op = match op {
			Some(op) if awaiting_this => return Ok(self.admit_while_awaiting(op)),
			other => other,
		};
		if awaiting_this {
			if let Some(prompt) = self.prompt.clone() {
				return Ok(Submission::AwaitingAuth(prompt));
			}
		}

		self.stop_attempt();
		self.slot.discard();

		let auth_url = match self.launcher.obtain_url(session_id).await {
			Ok(url) => url,
			Err(err) => {
				warn!(target = "fi.auth", %session_id, error = %err, "could not start authentication");
				self.set_state(AuthState::Unauthenticated);
				self.notify(Notice::error(err.to_string()));
				return Err(err);
			}
		};

		if let Some(op) = op {
			self.slot.offer(PendingOperation::new(op));
		}

		let warning = match self.launcher.open(&auth_url) {
			Ok(handle) => {
				self.surface = Some(handle);
				None
			}
			Err(err) => {
				let message = format!("Could not open the authentication page ({err}); open {auth_url} manually");
				warn!(target = "fi.auth", error = %err, "surface failed to open; polling anyway");
				self.notify(Notice::warning(message.clone()));
				Some(message)
			}
		};

		self.attempt += 1;
		self.poll = Some(self.start_poller(session_id));
		self.attempt_session = Some(session_id.to_string());
		let prompt = AuthPrompt {
			auth_url,
			surface_opened: self.surface.is_some(),
			warning,
		};
		self.prompt = Some(prompt.clone());
		info!(target = "fi.auth", %session_id, attempt = self.attempt, "waiting for external authentication");
		self.set_state(AuthState::AwaitingExternalCompletion);

		Ok(Submission::AwaitingAuth(prompt))
	}

	fn admit_while_awaiting(&mut self, op: Operation) -> Submission {
		match self.slot.admit(PendingOperation::new(op), self.policy) {
			Admission::Kept { replaced } => {
				let replaced = replaced.map(|p| p.payload);
				if let Some(replaced) = &replaced {
					debug!(target = "fi.auth", operation = %replaced.kind(), "pending operation replaced by a newer one");
				}
				Submission::Queued { replaced }
			}
			Admission::Rejected(rejected) => {
				debug!(target = "fi.auth", operation = %rejected.payload.kind(), "handshake in progress; discarding operation");
				self.notify(Notice::info("Authentication already in progress; request discarded"));
				Submission::Discarded(rejected.payload)
			}
		}
	}

	fn start_poller(&self, session_id: &str) -> PollHandle {
		let attempt = self.attempt;
		let backend = Arc::clone(&self.backend);
		let session_id = session_id.to_string();
		let tx = self.poll_tx.clone();

		StatusPoller::start(
			self.poll_config,
			move || {
				let backend = Arc::clone(&backend);
				let session_id = session_id.clone();
				async move { classify_status(backend.session_status(&session_id).await) }
			},
			move |outcome| {
				let _ = tx.send(PollEvent { attempt, outcome });
			},
		)
	}

	/// Applies an outcome the poller already delivered for the current
	/// attempt, so a new trigger never joins a handshake that has ended.
	/// The resolution is kept for the next `next_resolution` call.
	async fn settle_delivered(&mut self) {
		while self.state == AuthState::AwaitingExternalCompletion {
			let Ok(event) = self.poll_rx.try_recv() else {
				return;
			};
			if event.attempt != self.attempt {
				continue;
			}
			debug!(target = "fi.auth", attempt = event.attempt, "applying outcome delivered before the new trigger");
			let resolution = self.resolve(event.outcome).await;
			self.settled.push_back(resolution);
		}
	}

	/// Waits for the running attempt to end and applies its outcome.
	///
	/// Resolutions settled while admitting a later trigger come first, in
	/// order. Returns `None` immediately when no handshake is running.
	pub async fn next_resolution(&mut self) -> Option<AuthResolution> {
		if let Some(resolution) = self.settled.pop_front() {
			return Some(resolution);
		}
		while self.state == AuthState::AwaitingExternalCompletion {
			let event = self.poll_rx.recv().await?;
			if event.attempt != self.attempt {
				debug!(target = "fi.auth", stale = event.attempt, current = self.attempt, "ignoring outcome of a superseded attempt");
				continue;
			}
			return Some(self.resolve(event.outcome).await);
		}
		None
	}

	async fn resolve(&mut self, outcome: PollOutcome) -> AuthResolution {
		self.stop_attempt();
		let session_id = self.attempt_session.take();
		self.prompt = None;

		match outcome {
			PollOutcome::Authenticated => {
				self.set_state(AuthState::Authenticated);
				let replay = match (self.slot.drain(), session_id) {
					(Some(pending), Some(session_id)) => Some(self.replay(&session_id, pending).await),
					(Some(pending), None) => {
						warn!(target = "fi.auth", operation = %pending.payload.kind(), "no session to replay against");
						None
					}
					(None, _) => None,
				};
				self.notify(Notice::info("Authentication complete"));
				AuthResolution::Authenticated { replay }
			}
			PollOutcome::TimedOut => {
				let discarded = self.slot.discard().map(|p| p.payload);
				let waited_secs = self.poll_config.timeout.as_secs();
				self.set_state(AuthState::TimedOut);
				self.notify(Notice::warning(format!("Authentication timed out after {waited_secs}s; please try again")));
				AuthResolution::TimedOut { discarded, waited_secs }
			}
			PollOutcome::Failed(reason) => {
				let discarded = self.slot.discard().map(|p| p.payload);
				self.set_state(AuthState::Failed);
				self.notify(Notice::error(format!("Authentication failed: {reason}")));
				AuthResolution::Failed { reason, discarded }
			}
		}
	}

	async fn replay(&mut self, session_id: &str, pending: PendingOperation) -> Replay {
		let operation = pending.payload;
		info!(target = "fi.auth", %session_id, operation = %operation.kind(), "replaying pending operation");
		let result = self.backend.execute(session_id, &operation).await;
		if let Err(err) = &result {
			warn!(target = "fi.auth", operation = %operation.kind(), error = %err, "replay failed");
			self.notify(Notice::error(format!("Replaying {} failed: {err}", operation.kind())));
		}
		Replay { operation, result }
	}

	/// Abandons any running handshake and returns to `Unauthenticated`.
	///
	/// Idempotent. Outcomes already queued by the poller are invalidated.
	pub fn cancel(&mut self) -> Option<PendingOperation> {
		self.stop_attempt();
		self.attempt += 1;
		while self.poll_rx.try_recv().is_ok() {}
		self.settled.clear();
		self.attempt_session = None;
		self.prompt = None;
		let discarded = self.slot.discard();
		if let Some(pending) = &discarded {
			debug!(target = "fi.auth", operation = %pending.payload.kind(), "discarded pending operation on cancel");
		}
		self.set_state(AuthState::Unauthenticated);
		discarded
	}

	fn stop_attempt(&mut self) {
		if let Some(poll) = self.poll.take() {
			poll.cancel();
		}
		if let Some(handle) = self.surface.take() {
			self.launcher.close(handle);
		}
	}

	fn set_state(&mut self, to: AuthState) {
		let from = self.state;
		if from == to {
			return;
		}
		self.state = to;
		debug!(target = "fi.auth", %from, %to, "auth state changed");
		let _ = self.events.send(AuthEvent::StateChanged { from, to });
	}

	fn notify(&self, notice: Notice) {
		let _ = self.events.send(AuthEvent::Notice(notice));
	}
}

#[cfg(test)]
impl<B: Backend> AuthOrchestrator<B> {
	pub(super) fn inject_stale_outcome(&self, outcome: PollOutcome) {
		let _ = self.poll_tx.send(PollEvent {
			attempt: self.attempt.wrapping_sub(1),
			outcome,
		});
	}

	pub(super) fn poll_handle_for_test(&self) -> Option<PollHandle> {
		self.poll.clone()
	}
}

impl<B: Backend> Drop for AuthOrchestrator<B> {
	fn drop(&mut self) {
		if let Some(poll) = self.poll.take() {
			poll.cancel();
		}
	}
}

/// Maps a status check onto the poller's notion of progress.
fn classify_status(result: Result<AuthStatusResponse>) -> std::result::Result<bool, CheckError> {
	match result {
		Ok(status) => Ok(status.authenticated),
		Err(FiError::AuthRequired) => Ok(false),
		Err(err) if err.is_transient() => Err(CheckError::Transient(err.to_string())),
		Err(err) => Err(CheckError::Fatal(err.to_string())),
	}
}
