//! Well-known on-disk locations under the user config directory.

use std::path::PathBuf;

/// Root directory for client state: the platform config dir joined with
/// `fi` (`$XDG_CONFIG_HOME/fi` or `~/.config/fi` on Linux).
pub fn config_dir() -> PathBuf {
	dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("fi")
}

pub fn config_file() -> PathBuf {
	config_dir().join("config.json")
}

pub fn session_file() -> PathBuf {
	config_dir().join("session.json")
}

pub fn history_dir() -> PathBuf {
	config_dir().join("history")
}
