//! reqwest-backed implementation of [`Backend`].

use async_trait::async_trait;
use fi_protocol::{AuthStatusResponse, AuthUrlResponse, ChatRequest, CreateSessionResponse, DeleteSessionResponse, ErrorBody, HealthResponse, is_login_required};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::Backend;
use crate::config::ClientConfig;
use crate::error::{FiError, Result};
use crate::operation::{Operation, OperationOutput};

const USER_AGENT: &str = concat!("fi-client/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the backend API rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
	client: Client,
	base: Url,
	auth_required_statuses: Vec<u16>,
}

impl HttpBackend {
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let client = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(config.request_timeout())
			.build()
			.map_err(|e| FiError::Config(format!("Failed to create HTTP client: {e}")))?;

		Ok(Self {
			client,
			base: config.api_base()?,
			auth_required_statuses: config.auth_required_statuses.clone(),
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base
	}

	fn url(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|_| FiError::Config(format!("API URL cannot be used as a base: {}", self.base)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn session_url(&self, session_id: &str, tail: &[&str]) -> Result<Url> {
		let mut segments = vec!["session", session_id];
		segments.extend_from_slice(tail);
		self.url(&segments)
	}

	async fn send(&self, request: RequestBuilder, session_id: Option<&str>) -> Result<Value> {
		let response = request.send().await?;
		let status = response.status();
		let body = response.text().await?;

		debug!(target = "fi.backend", status = %status, body_len = body.len(), "backend response");

		if self.auth_required_statuses.contains(&status.as_u16()) {
			return Err(FiError::AuthRequired);
		}
		if status == StatusCode::NOT_FOUND {
			if let Some(id) = session_id {
				return Err(FiError::SessionNotFound(id.to_string()));
			}
		}
		if !status.is_success() {
			return Err(FiError::Status {
				status: status.as_u16(),
				message: error_message(&body, status),
			});
		}

		let value: Value = if body.trim().is_empty() { Value::Null } else { serde_json::from_str(&body)? };
		if is_login_required(&value) {
			return Err(FiError::AuthRequired);
		}
		Ok(value)
	}

	async fn send_typed<T: DeserializeOwned>(&self, request: RequestBuilder, session_id: Option<&str>) -> Result<T> {
		let value = self.send(request, session_id).await?;
		Ok(serde_json::from_value(value)?)
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		self.client.request(method, url)
	}
}

fn error_message(body: &str, status: StatusCode) -> String {
	serde_json::from_str::<ErrorBody>(body)
		.map(|e| e.detail)
		.ok()
		.or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[async_trait]
impl Backend for HttpBackend {
	async fn create_session(&self) -> Result<String> {
		let url = self.url(&["session", "create"])?;
		let created: CreateSessionResponse = self.send_typed(self.request(Method::POST, url), None).await?;
		Ok(created.session_id)
	}

	async fn session_status(&self, session_id: &str) -> Result<AuthStatusResponse> {
		let url = self.session_url(session_id, &["status"])?;
		self.send_typed(self.request(Method::GET, url), Some(session_id)).await
	}

	async fn auth_url(&self, session_id: &str) -> Result<String> {
		let url = self.session_url(session_id, &["auth-url"])?;
		let resp: AuthUrlResponse = self.send_typed(self.request(Method::GET, url), Some(session_id)).await?;
		Ok(resp.auth_url)
	}

	async fn delete_session(&self, session_id: &str) -> Result<()> {
		let url = self.session_url(session_id, &[])?;
		let body = self.send(self.request(Method::DELETE, url), Some(session_id)).await?;
		if let Ok(deleted) = serde_json::from_value::<DeleteSessionResponse>(body) {
			debug!(target = "fi.backend", %session_id, status = deleted.status.as_deref().unwrap_or_default(), "session deleted");
		}
		Ok(())
	}

	async fn execute(&self, session_id: &str, operation: &Operation) -> Result<OperationOutput> {
		let request = match operation {
			Operation::Chat { message } => self
				.request(Method::POST, self.session_url(session_id, &["chat"])?)
				.json(&ChatRequest { message: message.clone() }),
			Operation::Prefetch => self.request(Method::POST, self.session_url(session_id, &["prefetch"])?),
			Operation::Dashboard => self.request(Method::GET, self.session_url(session_id, &["dashboard"])?),
		};

		debug!(target = "fi.backend", %session_id, operation = %operation.kind(), "issuing operation");
		let body = self.send(request, Some(session_id)).await?;
		Ok(OperationOutput::new(operation.kind(), body))
	}

	async fn health(&self) -> Result<HealthResponse> {
		let url = self.url(&["health"])?;
		self.send_typed(self.request(Method::GET, url), None).await
	}
}
