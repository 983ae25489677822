//! Conversation history collaborator.
//!
//! The orchestrator never reads history; the CLI records chat turns here so
//! they can be listed later.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub role: Role,
	pub content: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tools_used: Vec<String>,
	/// Milliseconds since the Unix epoch.
	pub at: u64,
}

impl HistoryEntry {
	pub fn new(role: Role, content: impl Into<String>) -> Self {
		Self {
			role,
			content: content.into(),
			tools_used: Vec::new(),
			at: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default(),
		}
	}

	pub fn with_tools(mut self, tools: Vec<String>) -> Self {
		self.tools_used = tools;
		self
	}
}

pub trait ConversationHistory {
	fn append(&self, chat_id: &str, entry: &HistoryEntry) -> Result<()>;

	/// Most recent `limit` entries, oldest first.
	fn load(&self, chat_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// One JSON Lines file per chat.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
	dir: PathBuf,
}

impl JsonlHistory {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn file_for(&self, chat_id: &str) -> Result<PathBuf> {
		let valid = !chat_id.is_empty() && chat_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
		if !valid {
			return Err(FiError::Config(format!("invalid chat id '{chat_id}'")));
		}
		Ok(self.dir.join(format!("{chat_id}.jsonl")))
	}
}

impl ConversationHistory for JsonlHistory {
	fn append(&self, chat_id: &str, entry: &HistoryEntry) -> Result<()> {
		let path = self.file_for(chat_id)?;
		std::fs::create_dir_all(&self.dir)?;
		let mut file = OpenOptions::new().create(true).append(true).open(path)?;
		let mut line = serde_json::to_string(entry)?;
		line.push('\n');
		file.write_all(line.as_bytes())?;
		Ok(())
	}

	fn load(&self, chat_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
		let path = self.file_for(chat_id)?;
		let file = match std::fs::File::open(&path) {
			Ok(file) => file,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};

		let mut entries = Vec::new();
		for (index, raw) in BufReader::new(file).split(b'\n').enumerate() {
			let line = match String::from_utf8(raw?) {
				Ok(line) => line,
				Err(err) => {
					warn!(target = "fi", path = %path.display(), line = index + 1, error = %err, "skipping history line that is not UTF-8");
					continue;
				}
			};
			if line.trim().is_empty() {
				continue;
			}
			match serde_json::from_str::<HistoryEntry>(&line) {
				Ok(entry) => entries.push(entry),
				Err(err) => warn!(target = "fi", path = %path.display(), line = index + 1, error = %err, "skipping malformed history line"),
			}
		}

		let skip = entries.len().saturating_sub(limit);
		Ok(entries.split_off(skip))
	}
}
