//! Top-level owner of the session and its authentication handshake.

use std::sync::Arc;

use fi_protocol::AuthStatusResponse;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::Session;
use super::repository::SessionRepository;
use super::store::SessionStore;
use crate::auth::{AuthEvent, AuthOrchestrator, AuthResolution, AuthState, PendingOperation, Submission};
use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{FiError, Result};
use crate::operation::Operation;

/// Where the active session came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum SessionOrigin {
	Restored,
	Created,
	/// The stored session was rejected and a new one created.
	Replaced { previous: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Startup {
	pub session: Session,
	#[serde(flatten)]
	pub origin: SessionOrigin,
	pub authenticated: bool,
}

/// Creates, validates, replaces, and destroys the session, and routes
/// operations through the [`AuthOrchestrator`].
pub struct SessionController<B: Backend> {
	backend: Arc<B>,
	store: SessionStore<B>,
	auth: AuthOrchestrator<B>,
	session: Option<Session>,
}

impl<B: Backend> SessionController<B> {
	pub fn new(backend: Arc<B>, store: SessionStore<B>, auth: AuthOrchestrator<B>) -> Self {
		Self {
			backend,
			store,
			auth,
			session: None,
		}
	}

	/// Wires a controller from configuration. With `persist` off the session
	/// lives only as long as the process.
	pub fn from_config(config: &ClientConfig, backend: Arc<B>, persist: bool) -> Self {
		let repo = if persist {
			SessionRepository::new(Some(config.session_file_path()))
		} else {
			SessionRepository::ephemeral()
		};
		let store = SessionStore::new(repo, Arc::clone(&backend));
		let auth = AuthOrchestrator::new(Arc::clone(&backend), config.surface.build(), config.poll_config(), config.pending_policy);
		Self::new(backend, store, auth)
	}

	/// Restores the persisted session if the backend still accepts it,
	/// otherwise creates and persists a new one.
	pub async fn start(&mut self) -> Result<Startup> {
		let mut previous = None;

		if let Some(stored) = self.store.load() {
			if let Some(status) = self.store.check(&stored.id).await {
				info!(target = "fi.session", session_id = %stored.id, authenticated = status.authenticated, "restored session");
				self.auth.seed_from_status(&status);
				self.session = Some(stored.clone());
				return Ok(Startup {
					session: stored,
					origin: SessionOrigin::Restored,
					authenticated: status.authenticated,
				});
			}
			self.clear_store();
			previous = Some(stored.id);
		}

		let session = self.create().await?;
		Ok(Startup {
			session,
			origin: previous.map_or(SessionOrigin::Created, |previous| SessionOrigin::Replaced { previous }),
			authenticated: false,
		})
	}

	/// Issues `op` for the current session.
	///
	/// If the backend has forgotten the session, a new one is created and
	/// the operation is issued once more against it.
	pub async fn submit(&mut self, op: Operation) -> Result<Submission> {
		let session_id = self.require_session()?.id.clone();
		match self.auth.execute(&session_id, op.clone()).await {
			Err(FiError::SessionNotFound(_)) => {
				warn!(target = "fi.session", %session_id, "backend no longer knows the session; creating a new one");
				self.replace_session().await?;
				let session_id = self.require_session()?.id.clone();
				self.auth.execute(&session_id, op).await
			}
			other => other,
		}
	}

	/// Starts a handshake for the current session with nothing to replay.
	pub async fn authenticate(&mut self) -> Result<Submission> {
		let session_id = self.require_session()?.id.clone();
		self.auth.authenticate(&session_id).await
	}

	pub async fn next_resolution(&mut self) -> Option<AuthResolution> {
		self.auth.next_resolution().await
	}

	/// Abandons the current session and starts a fresh one.
	pub async fn reset_session(&mut self) -> Result<Session> {
		self.teardown().await;
		self.create().await
	}

	/// Abandons the current session without creating another. Returns the
	/// session that was dropped, if any.
	pub async fn logout(&mut self) -> Result<Option<Session>> {
		Ok(self.teardown().await)
	}

	/// Discards any pending handshake. Exposed for callers that give up
	/// waiting on their own terms.
	pub fn cancel_auth(&mut self) -> Option<PendingOperation> {
		self.auth.cancel()
	}

	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	pub fn require_session(&self) -> Result<&Session> {
		self.session.as_ref().ok_or(FiError::NoSession)
	}

	pub fn state(&self) -> AuthState {
		self.auth.state()
	}

	pub fn orchestrator(&self) -> &AuthOrchestrator<B> {
		&self.auth
	}

	pub fn store(&self) -> &SessionStore<B> {
		&self.store
	}

	pub fn backend(&self) -> &Arc<B> {
		&self.backend
	}

	pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
		self.auth.subscribe()
	}

	async fn create(&mut self) -> Result<Session> {
		let id = self.backend.create_session().await?;
		let session = Session::created(id);
		if let Err(err) = self.store.save(&session) {
			warn!(target = "fi.session", error = %err, "failed to persist session; it will not survive a restart");
		}
		info!(target = "fi.session", session_id = %session.id, "created session");
		self.auth.seed_from_status(&AuthStatusResponse::new(false));
		self.session = Some(session.clone());
		Ok(session)
	}

	async fn replace_session(&mut self) -> Result<Session> {
		self.auth.cancel();
		self.session = None;
		self.clear_store();
		self.create().await
	}

	async fn teardown(&mut self) -> Option<Session> {
		self.auth.cancel();
		let old = self.session.take().or_else(|| self.store.load());
		if let Some(old) = &old {
			match self.backend.delete_session(&old.id).await {
				Ok(()) => debug!(target = "fi.session", session_id = %old.id, "deleted remote session"),
				Err(err) => debug!(target = "fi.session", session_id = %old.id, error = %err, "remote session delete failed; continuing"),
			}
		}
		self.clear_store();
		old
	}

	fn clear_store(&self) {
		if let Err(err) = self.store.clear() {
			warn!(target = "fi.session", error = %err, "failed to remove session file");
		}
	}
}
