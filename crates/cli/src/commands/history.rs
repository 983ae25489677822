use fi::session::SessionRepository;
use fi::{ConversationHistory, FiError};

use crate::context::CommandContext;
use crate::output::HistoryData;

/// Reads local history only; the backend is never contacted.
pub(crate) fn run(limit: usize, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	ctx.finish(command, load(limit, ctx), Vec::new())
}

fn load(limit: usize, ctx: &CommandContext) -> anyhow::Result<HistoryData> {
	if !ctx.persist {
		return Err(FiError::NoSession.into());
	}
	let stored = SessionRepository::new(Some(ctx.config.session_file_path())).load()?.ok_or(FiError::NoSession)?;
	let entries = ctx.history().load(&stored.session_id, limit)?;
	Ok(HistoryData {
		session_id: stored.session_id,
		entries,
	})
}
