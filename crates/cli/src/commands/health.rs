use fi::Backend;

use crate::context::CommandContext;
use crate::output::HealthData;

pub(crate) async fn run(ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	let outcome = async {
		let health = ctx.backend()?.health().await?;
		Ok::<_, anyhow::Error>(HealthData {
			api_url: ctx.config.api_url.clone(),
			status: health.status,
			message: health.message,
			active_sessions: health.active_sessions,
		})
	}
	.await;
	ctx.finish(command, outcome, Vec::new())
}
