use std::path::PathBuf;

use fi::auth::{Notice, NoticeLevel};
use fi::{FiError, SurfaceMode};
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<EffectiveConfig>,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	AuthRequired,
	AuthTimeout,
	AuthFailed,
	AuthUrlUnavailable,
	NoSession,
	SessionError,
	BackendUnreachable,
	BackendError,
	InvalidInput,
	IoError,
	InternalError,
}

impl ErrorCode {
	/// Picks the code for an error bubbling out of a command.
	pub fn classify(err: &anyhow::Error) -> Self {
		let Some(fi_err) = err.downcast_ref::<FiError>() else {
			return ErrorCode::InternalError;
		};
		match fi_err {
			FiError::AuthRequired => ErrorCode::AuthRequired,
			FiError::AuthTimeout { .. } => ErrorCode::AuthTimeout,
			FiError::AuthFailed(_) => ErrorCode::AuthFailed,
			FiError::AuthUrlUnavailable(_) => ErrorCode::AuthUrlUnavailable,
			FiError::NoSession => ErrorCode::NoSession,
			FiError::SessionNotFound(_) => ErrorCode::SessionError,
			FiError::Transport(_) => ErrorCode::BackendUnreachable,
			FiError::Status { .. } => ErrorCode::BackendError,
			FiError::Config(_) | FiError::Url(_) => ErrorCode::InvalidInput,
			FiError::Io(_) => ErrorCode::IoError,
			FiError::Surface(_) | FiError::Json(_) => ErrorCode::InternalError,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::AuthRequired => write!(f, "AUTH_REQUIRED"),
			ErrorCode::AuthTimeout => write!(f, "AUTH_TIMEOUT"),
			ErrorCode::AuthFailed => write!(f, "AUTH_FAILED"),
			ErrorCode::AuthUrlUnavailable => write!(f, "AUTH_URL_UNAVAILABLE"),
			ErrorCode::NoSession => write!(f, "NO_SESSION"),
			ErrorCode::SessionError => write!(f, "SESSION_ERROR"),
			ErrorCode::BackendUnreachable => write!(f, "BACKEND_UNREACHABLE"),
			ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

/// Diagnostic message attached to a command result.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
}

impl From<Notice> for Diagnostic {
	fn from(notice: Notice) -> Self {
		let level = match notice.level {
			NoticeLevel::Info => DiagnosticLevel::Info,
			NoticeLevel::Warning => DiagnosticLevel::Warning,
			NoticeLevel::Error => DiagnosticLevel::Error,
		};
		Self {
			level,
			message: notice.message,
			source: Some("auth".into()),
		}
	}
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
	Error,
}

/// Effective configuration used for command execution.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	pub api_url: String,
	pub surface: SurfaceMode,
	pub poll_interval_ms: u64,
	pub auth_timeout_secs: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_file: Option<PathBuf>,
}

/// A command result with no payload data.
pub type EmptyResult = CommandResult<()>;
