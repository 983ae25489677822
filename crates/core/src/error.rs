//! Error types for session and authentication orchestration.

use thiserror::Error;

/// Errors produced by the client.
#[derive(Debug, Error)]
pub enum FiError {
	/// The request never produced an HTTP response (connect, timeout, TLS).
	#[error("Transport error: {0}")]
	Transport(String),

	/// A business operation was rejected until the session is linked to an
	/// external identity provider.
	#[error("Authentication required")]
	AuthRequired,

	/// The backend no longer recognizes the session id.
	#[error("Session not found: {0}")]
	SessionNotFound(String),

	/// Any other non-2xx response.
	#[error("Backend returned {status}: {message}")]
	Status { status: u16, message: String },

	#[error("Authentication URL unavailable: {0}")]
	AuthUrlUnavailable(String),

	#[error("Authentication timed out after {waited_secs}s")]
	AuthTimeout { waited_secs: u64 },

	#[error("Authentication failed: {0}")]
	AuthFailed(String),

	#[error("No active session")]
	NoSession,

	#[error("Authentication surface error: {0}")]
	Surface(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),
}

impl FiError {
	/// Returns true for failures worth polling through: the request never
	/// completed, the server was overloaded, or it asked us to back off.
	pub fn is_transient(&self) -> bool {
		match self {
			FiError::Transport(_) => true,
			FiError::Status { status, .. } => *status >= 500 || *status == 429,
			_ => false,
		}
	}
}

impl From<reqwest::Error> for FiError {
	fn from(err: reqwest::Error) -> Self {
		match err.status() {
			Some(status) => FiError::Status {
				status: status.as_u16(),
				message: err.to_string(),
			},
			None => FiError::Transport(err.to_string()),
		}
	}
}

pub type Result<T> = std::result::Result<T, FiError>;
