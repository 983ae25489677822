//! On-disk persistence of the session identifier.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{FiError, Result};

pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Contents of `session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
	pub schema: u32,
	pub session_id: String,
	/// Seconds since the Unix epoch.
	pub saved_at: u64,
}

impl StoredSession {
	pub fn new(session_id: impl Into<String>) -> Self {
		Self {
			schema: SESSION_SCHEMA_VERSION,
			session_id: session_id.into(),
			saved_at: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default(),
		}
	}
}

/// File-backed store for one [`StoredSession`]. Without a path every call is
/// a no-op.
#[derive(Debug, Clone, Default)]
pub struct SessionRepository {
	path: Option<PathBuf>,
}

impl SessionRepository {
	pub fn new(path: Option<PathBuf>) -> Self {
		Self { path }
	}

	pub fn ephemeral() -> Self {
		Self { path: None }
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Reads the stored session. A missing file is `Ok(None)`; anything
	/// unreadable or from another schema version is an error.
	pub fn load(&self) -> Result<Option<StoredSession>> {
		let Some(path) = self.path() else {
			return Ok(None);
		};
		let content = match std::fs::read_to_string(path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		let stored: StoredSession = serde_json::from_str(&content)?;
		if stored.schema != SESSION_SCHEMA_VERSION {
			return Err(FiError::Config(format!(
				"{}: unsupported session schema {} (expected {})",
				path.display(),
				stored.schema,
				SESSION_SCHEMA_VERSION
			)));
		}
		if stored.session_id.trim().is_empty() {
			return Err(FiError::Config(format!("{}: empty session id", path.display())));
		}
		Ok(Some(stored))
	}

	/// Writes through a temporary file so a crash never leaves a torn file.
	pub fn save(&self, stored: &StoredSession) -> Result<()> {
		let Some(path) = self.path() else {
			return Ok(());
		};
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let tmp = path.with_extension("json.tmp");
		std::fs::write(&tmp, serde_json::to_string_pretty(stored)?)?;
		std::fs::rename(&tmp, path)?;
		Ok(())
	}

	/// Removes the file if present. Returns whether anything was removed.
	pub fn clear(&self) -> Result<bool> {
		let Some(path) = self.path() else {
			return Ok(false);
		};
		match std::fs::remove_file(path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}
}
