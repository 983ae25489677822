mod auth;
mod health;
mod history;
mod ops;
mod session;

use fi::auth::AuthEvent;
use fi::{AuthResolution, FiError, HttpBackend, Replay, SessionController};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::info;

use crate::cli::{AuthAction, Cli, Commands, SessionAction};
use crate::context::{CommandContext, report_early_failure};
use crate::output::Diagnostic;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	let command = command_name(&cli.command);
	let ctx = match CommandContext::from_cli(&cli) {
		Ok(ctx) => ctx,
		Err(err) => return report_early_failure(command, cli.format, err.into()),
	};

	match cli.command {
		Commands::Session { action } => session::run(action, &ctx, command).await,
		Commands::Auth { action } => auth::run(action, &ctx, command).await,
		Commands::Chat { message, no_wait } => ops::chat(message, no_wait, &ctx, command).await,
		Commands::Dashboard { no_wait } => ops::dashboard(no_wait, &ctx, command).await,
		Commands::Prefetch { no_wait } => ops::prefetch(no_wait, &ctx, command).await,
		Commands::History { limit } => history::run(limit, &ctx, command),
		Commands::Health => health::run(&ctx, command).await,
	}
}

fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Session { action } => match action {
			SessionAction::Status => "session status",
			SessionAction::New => "session new",
			SessionAction::Clear => "session clear",
		},
		Commands::Auth { action } => match action {
			AuthAction::Login { .. } => "auth login",
			AuthAction::Status => "auth status",
		},
		Commands::Chat { .. } => "chat",
		Commands::Dashboard { .. } => "dashboard",
		Commands::Prefetch { .. } => "prefetch",
		Commands::History { .. } => "history",
		Commands::Health => "health",
	}
}

/// Collects handshake notices so they land in the result envelope.
pub(crate) struct Notices {
	rx: broadcast::Receiver<AuthEvent>,
}

impl Notices {
	pub(crate) fn watch(controller: &SessionController<HttpBackend>) -> Self {
		Self { rx: controller.subscribe() }
	}

	pub(crate) fn drain(mut self) -> Vec<Diagnostic> {
		let mut diagnostics = Vec::new();
		loop {
			match self.rx.try_recv() {
				Ok(AuthEvent::Notice(notice)) => diagnostics.push(Diagnostic::from(notice)),
				Ok(AuthEvent::StateChanged { .. }) | Err(TryRecvError::Lagged(_)) => {}
				Err(TryRecvError::Empty | TryRecvError::Closed) => break,
			}
		}
		diagnostics
	}
}

/// Blocks until the running handshake resolves or the user interrupts.
///
/// Returns the replayed operation when one was parked.
pub(crate) async fn wait_for_authentication(controller: &mut SessionController<HttpBackend>) -> anyhow::Result<Option<Replay>> {
	let timeout_secs = controller.orchestrator().poll_config().timeout.as_secs();
	info!(target = "fi", timeout_secs, "waiting for authentication to complete");

	let resolution = tokio::select! {
		resolution = controller.next_resolution() => resolution,
		_ = tokio::signal::ctrl_c() => None,
	};

	match resolution {
		Some(AuthResolution::Authenticated { replay }) => Ok(replay),
		Some(AuthResolution::TimedOut { waited_secs, .. }) => Err(FiError::AuthTimeout { waited_secs }.into()),
		Some(AuthResolution::Failed { reason, .. }) => Err(FiError::AuthFailed(reason).into()),
		None => {
			controller.cancel_auth();
			Err(FiError::AuthFailed("cancelled while waiting for authentication".into()).into())
		}
	}
}
