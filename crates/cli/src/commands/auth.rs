//! Explicit account linking, independent of any business operation.

use fi::Submission;

use super::{Notices, wait_for_authentication};
use crate::cli::AuthAction;
use crate::context::CommandContext;
use crate::output::{AuthData, AwaitingAuthData, Outcome};

pub(crate) async fn run(action: AuthAction, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	match action {
		AuthAction::Login { no_wait } => {
			let mut controller = ctx.controller()?;
			let notices = Notices::watch(&controller);
			let outcome = login(&mut controller, no_wait).await;
			ctx.finish(command, outcome, notices.drain())
		}
		AuthAction::Status => ctx.finish(command, status(ctx).await, Vec::new()),
	}
}

async fn login(controller: &mut fi::SessionController<fi::HttpBackend>, no_wait: bool) -> anyhow::Result<Outcome<AuthData>> {
	let startup = controller.start().await?;
	let session_id = startup.session.id;
	if startup.authenticated {
		return Ok(Outcome::Done(AuthData {
			session_id,
			state: controller.state(),
			authenticated: true,
		}));
	}

	match controller.authenticate().await? {
		Submission::AwaitingAuth(prompt) if no_wait => Ok(Outcome::AwaitingAuth(AwaitingAuthData::new(session_id, None, &prompt))),
		Submission::AwaitingAuth(_) => {
			wait_for_authentication(controller).await?;
			Ok(Outcome::Done(AuthData {
				session_id,
				state: controller.state(),
				authenticated: true,
			}))
		}
		other => anyhow::bail!("unexpected handshake result: {other:?}"),
	}
}

async fn status(ctx: &CommandContext) -> anyhow::Result<AuthData> {
	let mut controller = ctx.controller()?;
	let startup = controller.start().await?;
	Ok(AuthData {
		session_id: startup.session.id,
		state: controller.state(),
		authenticated: startup.authenticated,
	})
}
