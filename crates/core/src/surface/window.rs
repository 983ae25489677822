//! Dedicated Chromium-family window the client can close after success.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};
use url::Url;

use super::{Surface, SurfaceHandle};
use crate::error::{FiError, Result};

#[derive(Debug, Clone, Default)]
pub struct BrowserWindow {
	executable: Option<PathBuf>,
}

impl BrowserWindow {
	/// Uses the first Chromium-family browser found on this machine.
	pub fn new() -> Self {
		Self { executable: None }
	}

	pub fn with_executable(path: impl Into<PathBuf>) -> Self {
		Self {
			executable: Some(path.into()),
		}
	}

	fn resolve_executable(&self) -> Result<PathBuf> {
		if let Some(path) = &self.executable {
			return Ok(path.clone());
		}
		find_browser_executable()
			.map(PathBuf::from)
			.ok_or_else(|| FiError::Surface("Could not find a Chrome/Chromium executable".into()))
	}
}

impl Surface for BrowserWindow {
	fn open(&self, url: &Url) -> Result<SurfaceHandle> {
		let executable = self.resolve_executable()?;

		let mut cmd = Command::new(&executable);
		cmd.args(["--new-window", "--no-first-run", "--no-default-browser-check", url.as_str()])
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null());

		#[cfg(unix)]
		std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

		let child = cmd
			.spawn()
			.map_err(|e| FiError::Surface(format!("Failed to launch {}: {}", executable.display(), e)))?;
		debug!(target = "fi.surface", pid = child.id(), executable = %executable.display(), "browser window launched");
		Ok(SurfaceHandle::owned(url.clone(), child))
	}

	fn close(&self, handle: SurfaceHandle) {
		let Some(mut child) = handle.into_child() else {
			return;
		};
		if let Ok(Some(status)) = child.try_wait() {
			debug!(target = "fi.surface", %status, "browser window already exited");
			return;
		}
		match child.kill() {
			Ok(()) => {
				let _ = child.wait();
				debug!(target = "fi.surface", "browser window closed");
			}
			Err(err) => warn!(target = "fi.surface", error = %err, "failed to close browser window"),
		}
	}

	fn name(&self) -> &'static str {
		"window"
	}
}

fn find_browser_executable() -> Option<String> {
	let candidates: Vec<String> = if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_browser_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"brave-browser",
			"brave",
			"microsoft-edge",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	};

	candidates.into_iter().find(|candidate| is_available(candidate))
}

fn is_available(candidate: &str) -> bool {
	if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
		Path::new(candidate).exists()
	} else {
		which::which(candidate).is_ok()
	}
}

fn windows_browser_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(std::env::var_os)
		.map(PathBuf::from)
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
		&["BraveSoftware", "Brave-Browser", "Application", "brave.exe"],
	];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| suffixes.iter().map(move |suffix| suffix.iter().fold(root.clone(), |path, part| path.join(part))))
		.map(|path| path.to_string_lossy().into_owned())
		.collect();
	candidates.extend(["chrome.exe", "msedge.exe", "brave.exe"].map(str::to_string));
	candidates
}
