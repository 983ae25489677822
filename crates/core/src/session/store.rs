use std::sync::Arc;

use fi_protocol::AuthStatusResponse;
use tracing::{debug, info, warn};

use super::Session;
use super::repository::{SessionRepository, StoredSession};
use crate::backend::Backend;
use crate::error::Result;

/// Persists the session id across restarts and checks it against the
/// backend.
pub struct SessionStore<B> {
	repo: SessionRepository,
	backend: Arc<B>,
}

impl<B: Backend> SessionStore<B> {
	pub fn new(repo: SessionRepository, backend: Arc<B>) -> Self {
		Self { repo, backend }
	}

	pub fn repository(&self) -> &SessionRepository {
		&self.repo
	}

	/// Returns the persisted session, or `None` if there is none or it
	/// cannot be read.
	pub fn load(&self) -> Option<Session> {
		match self.repo.load() {
			Ok(stored) => stored.map(|s| Session::restored(s.session_id)),
			Err(err) => {
				warn!(target = "fi.session", error = %err, "ignoring unreadable session file");
				None
			}
		}
	}

	/// True if the backend still recognizes `id`. Never fails.
	pub async fn validate(&self, id: &str) -> bool {
		self.check(id).await.is_some()
	}

	/// Single status call; `None` on any error.
	pub async fn check(&self, id: &str) -> Option<AuthStatusResponse> {
		match self.backend.session_status(id).await {
			Ok(status) => {
				debug!(target = "fi.session", session_id = %id, authenticated = status.authenticated, "session is valid");
				Some(status)
			}
			Err(err) => {
				info!(target = "fi.session", session_id = %id, error = %err, "session failed validation");
				None
			}
		}
	}

	pub fn save(&self, session: &Session) -> Result<()> {
		self.repo.save(&StoredSession::new(session.id.clone()))
	}

	pub fn clear(&self) -> Result<bool> {
		self.repo.clear()
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;
	use crate::fake::FakeBackend;

	fn store(tmp: &TempDir, backend: FakeBackend) -> SessionStore<FakeBackend> {
		SessionStore::new(SessionRepository::new(Some(tmp.path().join("session.json"))), Arc::new(backend))
	}

	#[tokio::test]
	async fn corrupt_file_loads_as_none() {
		let tmp = TempDir::new().unwrap();
		std::fs::write(tmp.path().join("session.json"), "garbage").unwrap();
		assert!(store(&tmp, FakeBackend::new()).load().is_none());
	}

	#[tokio::test]
	async fn saved_session_is_restored_not_local() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp, FakeBackend::new());
		store.save(&Session::created("abc")).unwrap();

		let loaded = store.load().unwrap();
		assert_eq!(loaded.id, "abc");
		assert!(!loaded.created_locally);
	}

	#[tokio::test]
	async fn validate_treats_errors_as_invalid() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp, FakeBackend::new().with_session("known"));

		assert!(store.validate("known").await);
		assert!(!store.validate("abc").await);
		assert_eq!(store.check("known").await.map(|s| s.authenticated), Some(false));
	}
}
