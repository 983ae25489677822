//! Authentication handshake: polling, the pending-operation slot, and the
//! orchestrator that ties them to a surface.

mod events;
mod orchestrator;
mod pending;
mod poller;

pub use events::{AuthEvent, AuthState, Notice, NoticeLevel};
pub use orchestrator::{AuthOrchestrator, AuthPrompt, AuthResolution, Replay, Submission};
pub use pending::{Admission, Offer, PendingOperation, PendingPolicy, PendingSlot};
pub use poller::{CheckError, PollConfig, PollHandle, PollOutcome, StatusPoller};
