//! Per-invocation configuration shared by all commands.

use std::sync::Arc;

use fi::{ClientConfig, FiError, HttpBackend, JsonlHistory, SessionController, SurfaceMode};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::cli::Cli;
use crate::output::{Diagnostic, EffectiveConfig, ErrorCode, OutputFormat, ResultBuilder, print_result};

/// Resolved settings: config file, then `FI_*` environment, then flags.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub config: ClientConfig,
	pub format: OutputFormat,
	pub persist: bool,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> fi::Result<Self> {
		let mut config = ClientConfig::load(cli.config.as_deref())?;
		config.apply_env()?;

		if let Some(ref url) = cli.api_url {
			config.api_url = url.clone();
		}
		if let Some(ref path) = cli.session_file {
			config.session_file = Some(path.clone());
		}
		if let Some(surface) = cli.surface {
			config.surface = SurfaceMode::from(surface);
		}
		if let Some(ms) = cli.poll_interval_ms {
			config.poll_interval_ms = ms;
		}
		if let Some(secs) = cli.auth_timeout_secs {
			config.auth_timeout_secs = secs;
		}
		config.api_base()?;

		debug!(target = "fi", api_url = %config.api_url, surface = ?config.surface, "resolved client config");
		Ok(Self {
			config,
			format: cli.format,
			persist: !cli.no_save,
		})
	}

	pub fn backend(&self) -> fi::Result<Arc<HttpBackend>> {
		Ok(Arc::new(HttpBackend::new(&self.config)?))
	}

	pub fn controller(&self) -> fi::Result<SessionController<HttpBackend>> {
		Ok(SessionController::from_config(&self.config, self.backend()?, self.persist))
	}

	pub fn history(&self) -> JsonlHistory {
		JsonlHistory::new(self.config.history_dir_path())
	}

	pub fn effective_config(&self) -> EffectiveConfig {
		EffectiveConfig {
			api_url: self.config.api_url.clone(),
			surface: self.config.surface,
			poll_interval_ms: self.config.poll_interval_ms,
			auth_timeout_secs: self.config.auth_timeout_secs,
			session_file: self.persist.then(|| self.config.session_file_path()),
		}
	}

	/// Prints the envelope for `outcome` and hands the error back so the
	/// process exits non-zero.
	pub fn finish<T: Serialize>(&self, command: &str, outcome: anyhow::Result<T>, diagnostics: Vec<Diagnostic>) -> anyhow::Result<()> {
		let builder = ResultBuilder::new(command).config(self.effective_config()).diagnostics(diagnostics);
		match outcome {
			Ok(data) => {
				print_result(&builder.data(data).build(), self.format);
				Ok(())
			}
			Err(err) => {
				let code = ErrorCode::classify(&err);
				let result = match err.downcast_ref::<FiError>() {
					Some(FiError::Status { status, .. }) => builder.error_with_details(code, format!("{err:#}"), json!({ "status": status })),
					Some(FiError::AuthTimeout { waited_secs }) => builder.error_with_details(code, format!("{err:#}"), json!({ "waitedSecs": waited_secs })),
					_ => builder.error(code, format!("{err:#}")),
				}
				.build();
				print_result::<T>(&result, self.format);
				Err(err)
			}
		}
	}
}

/// Envelope for failures that happen before a context exists, such as an
/// unreadable config file.
pub fn report_early_failure(command: &str, format: OutputFormat, err: anyhow::Error) -> anyhow::Result<()> {
	let result = ResultBuilder::<()>::new(command).error(ErrorCode::classify(&err), format!("{err:#}")).build();
	print_result(&result, format);
	Err(err)
}
