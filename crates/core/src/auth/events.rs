//! Handshake state and the events broadcast to observers.

use std::fmt;

use serde::Serialize;

/// Authentication state of the current session.
///
/// Never persisted; re-derived from a status check when a session is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
	#[default]
	Unauthenticated,
	AwaitingExternalCompletion,
	Authenticated,
	TimedOut,
	Failed,
}

impl AuthState {
	/// True for states that end an attempt.
	pub fn is_terminal(self) -> bool {
		matches!(self, AuthState::Authenticated | AuthState::TimedOut | AuthState::Failed)
	}
}

impl fmt::Display for AuthState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AuthState::Unauthenticated => "unauthenticated",
			AuthState::AwaitingExternalCompletion => "awaiting_external_completion",
			AuthState::Authenticated => "authenticated",
			AuthState::TimedOut => "timed_out",
			AuthState::Failed => "failed",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
	Info,
	Warning,
	Error,
}

/// User-facing message about the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
	pub level: NoticeLevel,
	pub message: String,
}

impl Notice {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Info,
			message: message.into(),
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Warning,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Error,
			message: message.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
	StateChanged { from: AuthState, to: AuthState },
	Notice(Notice),
}
