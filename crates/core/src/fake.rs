//! In-memory backend and surface doubles for unit tests.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use fi_protocol::{AuthStatusResponse, HealthResponse};
use parking_lot::Mutex;
use serde_json::json;
use url::Url;

use crate::backend::Backend;
use crate::error::{FiError, Result};
use crate::operation::{Operation, OperationOutput};
use crate::surface::{Surface, SurfaceHandle};

pub(crate) const AUTH_URL: &str = "https://auth.example/x";

/// Scripted answer of one status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusStep {
	Authenticated(bool),
	Transient,
	Fatal,
}

#[derive(Default)]
struct State {
	next_id: u32,
	sessions: HashSet<String>,
	authenticated: bool,
	status_script: VecDeque<StatusStep>,
	status_calls: u32,
	auth_url_fails: bool,
	execute_fails: bool,
	executed: Vec<(String, Operation)>,
	deleted: Vec<String>,
}

/// Backend double. Business operations answer "authentication required"
/// until a status check has reported the session authenticated.
#[derive(Default)]
pub(crate) struct FakeBackend {
	state: Mutex<State>,
}

impl FakeBackend {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn with_session(self, id: &str) -> Self {
		self.state.lock().sessions.insert(id.to_string());
		self
	}

	pub(crate) fn set_authenticated(&self, authenticated: bool) {
		self.state.lock().authenticated = authenticated;
	}

	/// Status checks consume `steps` first, then report the current flag.
	pub(crate) fn script_status(&self, steps: impl IntoIterator<Item = StatusStep>) {
		self.state.lock().status_script.extend(steps);
	}

	pub(crate) fn fail_auth_url(&self) {
		self.state.lock().auth_url_fails = true;
	}

	/// Authenticated business operations fail with a server error.
	pub(crate) fn fail_execute(&self) {
		self.state.lock().execute_fails = true;
	}

	pub(crate) fn forget_session(&self, id: &str) {
		self.state.lock().sessions.remove(id);
	}

	pub(crate) fn status_calls(&self) -> u32 {
		self.state.lock().status_calls
	}

	pub(crate) fn executed(&self) -> Vec<(String, Operation)> {
		self.state.lock().executed.clone()
	}

	pub(crate) fn deleted(&self) -> Vec<String> {
		self.state.lock().deleted.clone()
	}

	pub(crate) fn has_session(&self, id: &str) -> bool {
		self.state.lock().sessions.contains(id)
	}
}

#[async_trait]
impl Backend for FakeBackend {
	async fn create_session(&self) -> Result<String> {
		let mut state = self.state.lock();
		state.next_id += 1;
		let id = format!("sess-{}", state.next_id);
		state.sessions.insert(id.clone());
		state.authenticated = false;
		Ok(id)
	}

	async fn session_status(&self, session_id: &str) -> Result<AuthStatusResponse> {
		let mut state = self.state.lock();
		state.status_calls += 1;
		if !state.sessions.contains(session_id) {
			return Err(FiError::SessionNotFound(session_id.to_string()));
		}
		match state.status_script.pop_front() {
			Some(StatusStep::Authenticated(value)) => state.authenticated = value,
			Some(StatusStep::Transient) => return Err(FiError::Transport("connection reset".into())),
			Some(StatusStep::Fatal) => {
				return Err(FiError::Status {
					status: 400,
					message: "bad session".into(),
				});
			}
			None => {}
		}
		Ok(AuthStatusResponse {
			session_id: Some(session_id.to_string()),
			..AuthStatusResponse::new(state.authenticated)
		})
	}

	async fn auth_url(&self, session_id: &str) -> Result<String> {
		let state = self.state.lock();
		if state.auth_url_fails {
			return Err(FiError::Status {
				status: 503,
				message: "identity provider unavailable".into(),
			});
		}
		if !state.sessions.contains(session_id) {
			return Err(FiError::SessionNotFound(session_id.to_string()));
		}
		Ok(AUTH_URL.to_string())
	}

	async fn delete_session(&self, session_id: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.deleted.push(session_id.to_string());
		if state.sessions.remove(session_id) {
			Ok(())
		} else {
			Err(FiError::SessionNotFound(session_id.to_string()))
		}
	}

	async fn execute(&self, session_id: &str, operation: &Operation) -> Result<OperationOutput> {
		let mut state = self.state.lock();
		state.executed.push((session_id.to_string(), operation.clone()));
		if !state.sessions.contains(session_id) {
			return Err(FiError::SessionNotFound(session_id.to_string()));
		}
		if !state.authenticated {
			return Err(FiError::AuthRequired);
		}
		if state.execute_fails {
			return Err(FiError::Status {
				status: 500,
				message: "tool call failed".into(),
			});
		}
		Ok(OperationOutput::new(operation.kind(), json!({ "response": format!("handled {}", operation.kind()), "tools_used": [] })))
	}

	async fn health(&self) -> Result<HealthResponse> {
		let state = self.state.lock();
		Ok(HealthResponse {
			status: "healthy".into(),
			message: None,
			active_sessions: Some(state.sessions.len() as u64),
		})
	}
}

/// Surface double that records what was opened and closed.
#[derive(Default)]
pub(crate) struct RecordingSurface {
	opened: Mutex<Vec<Url>>,
	closed: Mutex<Vec<Url>>,
	fails: Mutex<bool>,
}

impl RecordingSurface {
	pub(crate) fn failing() -> Self {
		Self {
			fails: Mutex::new(true),
			..Self::default()
		}
	}

	pub(crate) fn opened(&self) -> Vec<Url> {
		self.opened.lock().clone()
	}

	pub(crate) fn closed(&self) -> Vec<Url> {
		self.closed.lock().clone()
	}
}

impl Surface for RecordingSurface {
	fn open(&self, url: &Url) -> Result<SurfaceHandle> {
		if *self.fails.lock() {
			return Err(FiError::Surface("no browser available".into()));
		}
		self.opened.lock().push(url.clone());
		Ok(SurfaceHandle::detached(url.clone()))
	}

	fn close(&self, handle: SurfaceHandle) {
		self.closed.lock().push(handle.url().clone());
	}

	fn name(&self) -> &'static str {
		"recording"
	}
}
