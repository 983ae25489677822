use std::path::PathBuf;

use fi::auth::AuthState;
use fi::{AuthPrompt, HistoryEntry, OperationKind, SessionOrigin};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusData {
	pub session_id: String,
	#[serde(flatten)]
	pub origin: SessionOrigin,
	pub authenticated: bool,
	pub state: AuthState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNewData {
	pub session_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub previous: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClearData {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cleared: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
	pub session_id: String,
	pub state: AuthState,
	pub authenticated: bool,
}

/// Returned instead of a result when the caller opted not to wait for the
/// handshake.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwaitingAuthData {
	pub status: &'static str,
	pub session_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub operation: Option<OperationKind>,
	pub auth_url: String,
	pub surface_opened: bool,
}

impl AwaitingAuthData {
	pub fn new(session_id: impl Into<String>, operation: Option<OperationKind>, prompt: &AuthPrompt) -> Self {
		Self {
			status: "awaiting_auth",
			session_id: session_id.into(),
			operation,
			auth_url: prompt.auth_url.to_string(),
			surface_opened: prompt.surface_opened,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
	pub session_id: String,
	pub response: String,
	pub tools_used: Vec<String>,
	/// True when the answer came from replaying the message after
	/// authentication.
	pub replayed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
	pub session_id: String,
	pub operation: OperationKind,
	pub replayed: bool,
	pub body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryData {
	pub session_id: String,
	pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
	pub api_url: String,
	pub status: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub active_sessions: Option<u64>,
}

/// Either the command's own payload or a pending handshake.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
	Done(T),
	AwaitingAuth(AwaitingAuthData),
}
