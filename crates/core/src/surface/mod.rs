//! External authentication surfaces.
//!
//! The client never renders the identity provider itself. It obtains a URL
//! from the backend and hands it to a [`Surface`]: the system browser, a
//! dedicated browser window it can close again, or a printed link.

mod system;
mod window;

use std::process::Child;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

pub use system::{PrintSurface, SystemBrowser, is_headless_environment};
pub use window::BrowserWindow;

use crate::backend::Backend;
use crate::error::{FiError, Result};

/// Something that can show an authentication URL to a person.
pub trait Surface: Send + Sync {
	fn open(&self, url: &Url) -> Result<SurfaceHandle>;

	/// Best effort; surfaces that cannot be closed ignore the call.
	fn close(&self, handle: SurfaceHandle);

	fn name(&self) -> &'static str;
}

/// An opened surface.
#[derive(Debug)]
pub struct SurfaceHandle {
	url: Url,
	child: Option<Child>,
}

impl SurfaceHandle {
	/// A surface the client has no further control over.
	pub fn detached(url: Url) -> Self {
		Self { url, child: None }
	}

	/// A surface backed by a process the client spawned and may terminate.
	pub fn owned(url: Url, child: Child) -> Self {
		Self { url, child: Some(child) }
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn is_owned(&self) -> bool {
		self.child.is_some()
	}

	pub(crate) fn into_child(self) -> Option<Child> {
		self.child
	}
}

/// How the authentication URL is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMode {
	/// System browser, or a printed link in headless environments.
	#[default]
	Auto,
	Browser,
	Window,
	Print,
}

impl SurfaceMode {
	pub fn build(self) -> Arc<dyn Surface> {
		match self {
			SurfaceMode::Auto if is_headless_environment() => Arc::new(PrintSurface),
			SurfaceMode::Auto | SurfaceMode::Browser => Arc::new(SystemBrowser),
			SurfaceMode::Window => Arc::new(BrowserWindow::new()),
			SurfaceMode::Print => Arc::new(PrintSurface),
		}
	}
}

/// Fetches authentication URLs and drives a [`Surface`].
pub struct SurfaceLauncher<B> {
	backend: Arc<B>,
	surface: Arc<dyn Surface>,
}

impl<B: Backend> SurfaceLauncher<B> {
	pub fn new(backend: Arc<B>, surface: Arc<dyn Surface>) -> Self {
		Self { backend, surface }
	}

	/// Asks the backend for the session's authentication URL.
	///
	/// Every failure, including an unusable URL, is reported as
	/// [`FiError::AuthUrlUnavailable`].
	pub async fn obtain_url(&self, session_id: &str) -> Result<Url> {
		let raw = self
			.backend
			.auth_url(session_id)
			.await
			.map_err(|err| FiError::AuthUrlUnavailable(err.to_string()))?;
		let url = validate_auth_url(&raw)?;
		debug!(target = "fi.surface", %session_id, host = url.host_str().unwrap_or_default(), "obtained auth url");
		Ok(url)
	}

	pub fn open(&self, url: &Url) -> Result<SurfaceHandle> {
		let handle = self.surface.open(url)?;
		info!(target = "fi.surface", surface = self.surface.name(), owned = handle.is_owned(), "opened authentication surface");
		Ok(handle)
	}

	pub fn close(&self, handle: SurfaceHandle) {
		debug!(target = "fi.surface", surface = self.surface.name(), "closing authentication surface");
		self.surface.close(handle);
	}
}

fn validate_auth_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).map_err(|e| FiError::AuthUrlUnavailable(format!("malformed URL '{raw}': {e}")))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(FiError::AuthUrlUnavailable(format!("unsupported scheme '{}'", url.scheme())));
	}
	if url.host_str().is_none() {
		return Err(FiError::AuthUrlUnavailable("URL has no host".into()));
	}
	if !url.username().is_empty() || url.password().is_some() {
		warn!(target = "fi.surface", "backend returned an auth url with embedded credentials");
		return Err(FiError::AuthUrlUnavailable("URL must not embed credentials".into()));
	}
	Ok(url)
}
