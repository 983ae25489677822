//! Session identity: persistence, validation, and lifecycle.

mod controller;
mod repository;
mod store;

use serde::Serialize;

pub use controller::{SessionController, SessionOrigin, Startup};
pub use repository::{SESSION_SCHEMA_VERSION, SessionRepository, StoredSession};
pub use store::SessionStore;

/// A conversation session known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub id: String,
	/// True when this process created the session, false when it was
	/// restored from storage.
	pub created_locally: bool,
}

impl Session {
	pub fn created(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			created_locally: true,
		}
	}

	pub fn restored(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			created_locally: false,
		}
	}
}
