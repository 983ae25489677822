//! Backend seam consumed by the session and authentication layers.

mod http;

use async_trait::async_trait;
use fi_protocol::{AuthStatusResponse, HealthResponse};

pub use http::HttpBackend;

use crate::error::Result;
use crate::operation::{Operation, OperationOutput};

/// Remote API used by the orchestrator.
///
/// Implementations map the distinguished "authentication required" answer of
/// business operations to [`FiError::AuthRequired`] and an unknown session id
/// to [`FiError::SessionNotFound`].
///
/// [`FiError::AuthRequired`]: crate::FiError::AuthRequired
/// [`FiError::SessionNotFound`]: crate::FiError::SessionNotFound
#[async_trait]
pub trait Backend: Send + Sync + 'static {
	/// Creates a session and returns its id.
	async fn create_session(&self) -> Result<String>;

	/// Reports whether the session is linked to an external identity.
	async fn session_status(&self, session_id: &str) -> Result<AuthStatusResponse>;

	/// Returns the URL of the external authentication surface.
	async fn auth_url(&self, session_id: &str) -> Result<String>;

	/// Deletes the session server-side.
	async fn delete_session(&self, session_id: &str) -> Result<()>;

	/// Issues a business operation on behalf of the session.
	async fn execute(&self, session_id: &str, operation: &Operation) -> Result<OperationOutput>;

	async fn health(&self) -> Result<HealthResponse>;
}
