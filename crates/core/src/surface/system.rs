use std::process::{Command, Stdio};

use tracing::debug;
use url::Url;

use super::{Surface, SurfaceHandle};
use crate::error::{FiError, Result};

/// Opens the URL with the platform's default handler.
///
/// The opener exits as soon as it has handed the URL over, so the resulting
/// tab cannot be closed from here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Surface for SystemBrowser {
	fn open(&self, url: &Url) -> Result<SurfaceHandle> {
		let mut cmd = opener_command(url.as_str());
		cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
		cmd.spawn()
			.map_err(|e| FiError::Surface(format!("Failed to open browser: {e}")))?;
		Ok(SurfaceHandle::detached(url.clone()))
	}

	fn close(&self, handle: SurfaceHandle) {
		debug!(target = "fi.surface", url = %handle.url(), "system browser tab left open");
	}

	fn name(&self) -> &'static str {
		"browser"
	}
}

/// Hands `url` to the platform handler as a single argument. No shell sits
/// in between, so query separators such as `&` reach the browser intact.
fn opener_command(url: &str) -> Command {
	if cfg!(target_os = "macos") {
		macos_opener(url)
	} else if cfg!(target_os = "windows") {
		windows_opener(url)
	} else {
		xdg_opener(url)
	}
}

fn macos_opener(url: &str) -> Command {
	let mut cmd = Command::new("open");
	cmd.arg("--").arg(url);
	cmd
}

fn windows_opener(url: &str) -> Command {
	let mut cmd = Command::new("rundll32");
	cmd.args(["url.dll,FileProtocolHandler", url]);
	cmd
}

fn xdg_opener(url: &str) -> Command {
	let mut cmd = Command::new("xdg-open");
	cmd.arg(url);
	cmd
}

/// Prints the URL to stderr for the user to open elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintSurface;

impl Surface for PrintSurface {
	fn open(&self, url: &Url) -> Result<SurfaceHandle> {
		eprintln!("Open this link to connect your account:\n\n  {url}\n");
		Ok(SurfaceHandle::detached(url.clone()))
	}

	fn close(&self, _handle: SurfaceHandle) {}

	fn name(&self) -> &'static str {
		"print"
	}
}

/// True when no browser can be shown: SSH without a forwarded display, a
/// Linux session with neither X11 nor Wayland, a container, or CI.
pub fn is_headless_environment() -> bool {
	headless_from(|key| std::env::var_os(key).is_some(), std::path::Path::new("/.dockerenv").exists())
}

fn headless_from(has_var: impl Fn(&str) -> bool, in_container: bool) -> bool {
	let has_display = has_var("DISPLAY") || has_var("WAYLAND_DISPLAY");

	if (has_var("SSH_CLIENT") || has_var("SSH_TTY")) && !has_var("DISPLAY") {
		return true;
	}
	if cfg!(target_os = "linux") && !has_display {
		return true;
	}
	in_container || has_var("CI") || has_var("GITHUB_ACTIONS")
}
