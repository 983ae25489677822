//! Business operation bodies: chat, prefetch.

use serde::{Deserialize, Serialize};

/// `POST /session/{id}/chat` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
	pub message: String,
}

/// `POST /session/{id}/chat` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	pub response: String,
	#[serde(default)]
	pub tools_used: Vec<String>,
}

/// `POST /session/{id}/prefetch` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	pub success: bool,
	#[serde(default)]
	pub data_loaded: Vec<String>,
	#[serde(default)]
	pub failed_tools: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
