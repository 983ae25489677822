//! Client configuration.
//!
//! Resolution order, later wins: built-in defaults, `config.json` in the
//! client config directory, `FI_*` environment variables, then explicit
//! overrides applied by the caller (CLI flags).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::{PendingPolicy, PollConfig};
use crate::error::{FiError, Result};
use crate::paths;
use crate::surface::SurfaceMode;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "FI_API_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "FI_POLL_INTERVAL_MS";
pub const ENV_AUTH_TIMEOUT_SECS: &str = "FI_AUTH_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
	/// Backend base URL; endpoint paths are appended to it.
	pub api_url: String,
	pub poll_interval_ms: u64,
	pub auth_timeout_secs: u64,
	pub request_timeout_secs: u64,
	/// HTTP statuses that business operations use to signal auth-required.
	pub auth_required_statuses: Vec<u16>,
	pub pending_policy: PendingPolicy,
	pub surface: SurfaceMode,
	/// Overrides the persisted session location.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_file: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub history_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
			auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
			request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
			auth_required_statuses: vec![401, 423],
			pending_policy: PendingPolicy::default(),
			surface: SurfaceMode::default(),
			session_file: None,
			history_dir: None,
		}
	}
}

impl ClientConfig {
	/// Loads `path`, or the default config file when `path` is `None`.
	///
	/// A missing file yields defaults; a malformed one is an error.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let path = path.map(Path::to_path_buf).unwrap_or_else(paths::config_file);
		match std::fs::read_to_string(&path) {
			Ok(content) => {
				debug!(target = "fi", path = %path.display(), "loaded client config");
				serde_json::from_str(&content).map_err(|e| FiError::Config(format!("{}: {}", path.display(), e)))
			}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(err) => Err(err.into()),
		}
	}

	/// Applies `FI_*` overrides from the process environment.
	pub fn apply_env(&mut self) -> Result<()> {
		self.apply_env_from(|key| std::env::var(key).ok())
	}

	/// Applies `FI_*` overrides from an arbitrary variable lookup.
	pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
		if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
			self.api_url = url;
		}
		if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
			self.poll_interval_ms = parse_env_u64(ENV_POLL_INTERVAL_MS, &raw)?;
		}
		if let Some(raw) = lookup(ENV_AUTH_TIMEOUT_SECS) {
			self.auth_timeout_secs = parse_env_u64(ENV_AUTH_TIMEOUT_SECS, &raw)?;
		}
		Ok(())
	}

	/// Parses and checks the base URL.
	pub fn api_base(&self) -> Result<Url> {
		let url = Url::parse(&self.api_url)?;
		match url.scheme() {
			"http" | "https" => {}
			scheme => return Err(FiError::Config(format!("API URL must use http or https, got '{scheme}'"))),
		}
		if url.cannot_be_a_base() {
			return Err(FiError::Config(format!("API URL cannot be used as a base: {}", self.api_url)));
		}
		Ok(url)
	}

	pub fn poll_config(&self) -> PollConfig {
		PollConfig {
			interval: Duration::from_millis(self.poll_interval_ms.max(1)),
			timeout: Duration::from_secs(self.auth_timeout_secs),
		}
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs.max(1))
	}

	pub fn session_file_path(&self) -> PathBuf {
		self.session_file.clone().unwrap_or_else(paths::session_file)
	}

	pub fn history_dir_path(&self) -> PathBuf {
		self.history_dir.clone().unwrap_or_else(paths::history_dir)
	}
}

fn parse_env_u64(key: &str, raw: &str) -> Result<u64> {
	raw.trim()
		.parse()
		.map_err(|_| FiError::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
}
