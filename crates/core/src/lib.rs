//! Client for the financial-assistant backend.
//!
//! The crate keeps one conversation session alive across restarts and
//! handles the external authentication handshake the backend demands before
//! it will touch financial data:
//!
//! - [`SessionController`] owns the session and is the entry point.
//! - [`AuthOrchestrator`] runs the handshake and replays the operation that
//!   triggered it.
//! - [`StatusPoller`] polls for completion with a wall-clock deadline.
//! - [`Backend`] is the seam to the remote API; [`HttpBackend`] speaks HTTP.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod operation;
pub mod paths;
pub mod session;
pub mod surface;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::{AuthEvent, AuthOrchestrator, AuthPrompt, AuthResolution, AuthState, PendingPolicy, PollConfig, Replay, StatusPoller, Submission};
pub use backend::{Backend, HttpBackend};
pub use config::ClientConfig;
pub use error::{FiError, Result};
pub use history::{ConversationHistory, HistoryEntry, JsonlHistory, Role};
pub use operation::{Operation, OperationKind, OperationOutput};
pub use session::{Session, SessionController, SessionOrigin, SessionStore, Startup};
pub use surface::{Surface, SurfaceHandle, SurfaceLauncher, SurfaceMode};
