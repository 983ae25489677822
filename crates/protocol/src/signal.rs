//! Detection of the in-band "login required" signal.
//!
//! Besides HTTP 401/423, business endpoints can answer 2xx with a body whose
//! `status` is `"login_required"`, either at the top level or inside the
//! first `content[].text` entry as an embedded JSON document (tool-call
//! envelopes forward the upstream payload that way).

use serde_json::Value;

/// Status string carried by login-required bodies.
pub const LOGIN_REQUIRED_STATUS: &str = "login_required";

/// Returns true if `body` carries the login-required signal.
pub fn is_login_required(body: &Value) -> bool {
	let Some(obj) = body.as_object() else {
		return false;
	};

	if obj.get("status").and_then(Value::as_str) == Some(LOGIN_REQUIRED_STATUS) {
		return true;
	}

	obj.get("content")
		.and_then(Value::as_array)
		.and_then(|content| content.first())
		.and_then(|first| first.get("text"))
		.and_then(Value::as_str)
		.and_then(|text| serde_json::from_str::<Value>(text).ok())
		.is_some_and(|embedded| embedded.get("status").and_then(Value::as_str) == Some(LOGIN_REQUIRED_STATUS))
}
