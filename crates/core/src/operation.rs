//! Business operations that may be rejected with "authentication required".

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request description that can be issued, captured, and replayed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
	/// Send a chat message to the assistant.
	Chat { message: String },
	/// Ask the backend to load all financial data sources for the session.
	Prefetch,
	/// Read the aggregated dashboard.
	Dashboard,
}

impl Operation {
	pub fn chat(message: impl Into<String>) -> Self {
		Operation::Chat { message: message.into() }
	}

	pub fn kind(&self) -> OperationKind {
		match self {
			Operation::Chat { .. } => OperationKind::Chat,
			Operation::Prefetch => OperationKind::Prefetch,
			Operation::Dashboard => OperationKind::Dashboard,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	Chat,
	Prefetch,
	Dashboard,
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OperationKind::Chat => write!(f, "chat"),
			OperationKind::Prefetch => write!(f, "prefetch"),
			OperationKind::Dashboard => write!(f, "dashboard"),
		}
	}
}

/// Successful response body of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutput {
	pub operation: OperationKind,
	pub body: Value,
}

impl OperationOutput {
	pub fn new(operation: OperationKind, body: Value) -> Self {
		Self { operation, body }
	}

	/// Decodes the body into a typed response.
	pub fn decode<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
		Ok(serde_json::from_value(self.body.clone())?)
	}
}
