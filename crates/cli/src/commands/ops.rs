//! Business operations that may need the handshake before they succeed.

use fi::{ConversationHistory, FiError, HistoryEntry, HttpBackend, Operation, OperationOutput, Role, SessionController, Submission};
use fi_protocol::{ChatResponse, PrefetchResponse};
use tracing::warn;

use super::{Notices, wait_for_authentication};
use crate::context::CommandContext;
use crate::output::{AwaitingAuthData, ChatData, Diagnostic, DiagnosticLevel, OperationData, Outcome};

/// An operation that finished, directly or by replay.
struct Completed {
	session_id: String,
	output: OperationOutput,
	replayed: bool,
}

pub(crate) async fn chat(message: String, no_wait: bool, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	let mut controller = ctx.controller()?;
	let notices = Notices::watch(&controller);
	let mut diagnostics = Vec::new();

	let outcome = match run(&mut controller, Operation::chat(message.clone()), no_wait).await {
		Ok(Outcome::Done(done)) => chat_data(ctx, &message, done, &mut diagnostics).map(Outcome::Done),
		Ok(Outcome::AwaitingAuth(awaiting)) => Ok(Outcome::AwaitingAuth(awaiting)),
		Err(err) => Err(err),
	};

	let mut all = notices.drain();
	all.append(&mut diagnostics);
	ctx.finish(command, outcome, all)
}

pub(crate) async fn dashboard(no_wait: bool, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	let mut controller = ctx.controller()?;
	let notices = Notices::watch(&controller);
	let outcome = run(&mut controller, Operation::Dashboard, no_wait).await.map(|outcome| match outcome {
		Outcome::Done(done) => Outcome::Done(operation_data(done)),
		Outcome::AwaitingAuth(awaiting) => Outcome::AwaitingAuth(awaiting),
	});
	ctx.finish(command, outcome, notices.drain())
}

pub(crate) async fn prefetch(no_wait: bool, ctx: &CommandContext, command: &str) -> anyhow::Result<()> {
	let mut controller = ctx.controller()?;
	let notices = Notices::watch(&controller);
	let mut diagnostics = Vec::new();

	let outcome = run(&mut controller, Operation::Prefetch, no_wait).await.map(|outcome| match outcome {
		Outcome::Done(done) => {
			if let Ok(report) = done.output.decode::<PrefetchResponse>() {
				if !report.failed_tools.is_empty() {
					diagnostics.push(Diagnostic {
						level: DiagnosticLevel::Warning,
						message: format!("some data sources failed to load: {}", report.failed_tools.join(", ")),
						source: Some("prefetch".into()),
					});
				}
			}
			Outcome::Done(operation_data(done))
		}
		Outcome::AwaitingAuth(awaiting) => Outcome::AwaitingAuth(awaiting),
	});

	let mut all = notices.drain();
	all.append(&mut diagnostics);
	ctx.finish(command, outcome, all)
}

/// Starts the session, submits `op`, and waits out the handshake unless
/// `no_wait` is set.
async fn run(controller: &mut SessionController<HttpBackend>, op: Operation, no_wait: bool) -> anyhow::Result<Outcome<Completed>> {
	controller.start().await?;
	let kind = op.kind();

	let submission = controller.submit(op).await?;
	// A 404 during submit may have swapped the session.
	let session_id = controller.require_session()?.id.clone();

	match submission {
		Submission::Completed(output) => Ok(Outcome::Done(Completed {
			session_id,
			output,
			replayed: false,
		})),
		Submission::AwaitingAuth(prompt) if no_wait => Ok(Outcome::AwaitingAuth(AwaitingAuthData::new(session_id, Some(kind), &prompt))),
		Submission::AwaitingAuth(_) => match wait_for_authentication(controller).await? {
			Some(replay) => Ok(Outcome::Done(Completed {
				session_id,
				output: replay.result?,
				replayed: true,
			})),
			None => Err(FiError::AuthFailed(format!("{kind} was not replayed after authentication")).into()),
		},
		Submission::Discarded(_) | Submission::Queued { .. } => anyhow::bail!("another authentication handshake is already in progress"),
	}
}

fn chat_data(ctx: &CommandContext, message: &str, done: Completed, diagnostics: &mut Vec<Diagnostic>) -> anyhow::Result<ChatData> {
	let reply: ChatResponse = done.output.decode()?;

	if ctx.persist {
		let history = ctx.history();
		let turn = [
			HistoryEntry::new(Role::User, message),
			HistoryEntry::new(Role::Assistant, reply.response.clone()).with_tools(reply.tools_used.clone()),
		];
		for entry in &turn {
			if let Err(err) = history.append(&done.session_id, entry) {
				warn!(target = "fi", error = %err, "could not record chat history");
				diagnostics.push(Diagnostic {
					level: DiagnosticLevel::Warning,
					message: format!("chat history not saved: {err}"),
					source: Some("history".into()),
				});
				break;
			}
		}
	}

	Ok(ChatData {
		session_id: done.session_id,
		response: reply.response,
		tools_used: reply.tools_used,
		replayed: done.replayed,
	})
}

fn operation_data(done: Completed) -> OperationData {
	OperationData {
		session_id: done.session_id,
		operation: done.output.operation,
		replayed: done.replayed,
		body: done.output.body,
	}
}
