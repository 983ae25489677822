use std::path::Path;

use crate::cli::SessionAction;
use crate::context::CommandContext;
use crate::output::{SessionClearData, SessionNewData, SessionStatusData};

pub(crate) async fn run(action: SessionAction, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	match action {
		SessionAction::Status => ctx.finish(command, status(ctx).await, Vec::new()),
		SessionAction::New => ctx.finish(command, renew(ctx).await, Vec::new()),
		SessionAction::Clear => ctx.finish(command, clear(ctx).await, Vec::new()),
	}
}

async fn status(ctx: &CommandContext) -> anyhow::Result<SessionStatusData> {
	let mut controller = ctx.controller()?;
	let startup = controller.start().await?;
	Ok(SessionStatusData {
		session_id: startup.session.id,
		origin: startup.origin,
		authenticated: startup.authenticated,
		state: controller.state(),
		session_file: controller.store().repository().path().map(Path::to_path_buf),
	})
}

async fn renew(ctx: &CommandContext) -> anyhow::Result<SessionNewData> {
	let mut controller = ctx.controller()?;
	let previous = controller.store().load().map(|session| session.id);
	let session = controller.reset_session().await?;
	Ok(SessionNewData {
		session_id: session.id,
		previous,
	})
}

async fn clear(ctx: &CommandContext) -> anyhow::Result<SessionClearData> {
	let mut controller = ctx.controller()?;
	let cleared = controller.logout().await?.map(|session| session.id);
	Ok(SessionClearData { cleared })
}
