//! Single-slot holding area for the operation that triggered authentication.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// An operation captured on "authentication required", waiting for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
	pub payload: Operation,
	pub enqueued_at: SystemTime,
}

impl PendingOperation {
	pub fn new(payload: Operation) -> Self {
		Self {
			payload,
			enqueued_at: SystemTime::now(),
		}
	}
}

/// What to do with an auth-required operation that arrives while another
/// one is already waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
	/// The first operation stays; later ones are discarded.
	#[default]
	KeepFirst,
	/// The newest operation replaces the waiting one.
	ReplaceWithLatest,
}

/// Result of [`PendingSlot::offer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
	Accepted,
	/// The slot was already occupied; the offered operation is handed back.
	Rejected(PendingOperation),
}

/// Result of [`PendingSlot::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
	/// The incoming operation is now in the slot.
	Kept { replaced: Option<PendingOperation> },
	/// The slot kept its current occupant.
	Rejected(PendingOperation),
}

/// Holds at most one [`PendingOperation`].
#[derive(Debug, Default)]
pub struct PendingSlot {
	entry: Option<PendingOperation>,
}

impl PendingSlot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `op` if the slot is empty.
	pub fn offer(&mut self, op: PendingOperation) -> Offer {
		if self.entry.is_some() {
			return Offer::Rejected(op);
		}
		self.entry = Some(op);
		Offer::Accepted
	}

	/// Stores `op` unconditionally and returns whatever it displaced.
	pub fn replace(&mut self, op: PendingOperation) -> Option<PendingOperation> {
		self.entry.replace(op)
	}

	/// Applies `policy` to an incoming operation.
	pub fn admit(&mut self, op: PendingOperation, policy: PendingPolicy) -> Admission {
		match policy {
			PendingPolicy::KeepFirst => match self.offer(op) {
				Offer::Accepted => Admission::Kept { replaced: None },
				Offer::Rejected(op) => Admission::Rejected(op),
			},
			PendingPolicy::ReplaceWithLatest => Admission::Kept { replaced: self.replace(op) },
		}
	}

	/// Takes the operation out for replay. A second drain returns `None`.
	pub fn drain(&mut self) -> Option<PendingOperation> {
		self.entry.take()
	}

	/// Drops the waiting operation without replaying it.
	pub fn discard(&mut self) -> Option<PendingOperation> {
		self.entry.take()
	}

	pub fn peek(&self) -> Option<&PendingOperation> {
		self.entry.as_ref()
	}

	pub fn is_occupied(&self) -> bool {
		self.entry.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn op(message: &str) -> PendingOperation {
		PendingOperation::new(Operation::chat(message))
	}

	#[test]
	fn offer_keeps_the_first_operation() {
		let mut slot = PendingSlot::new();
		assert_eq!(slot.offer(op("first")), Offer::Accepted);

		let Offer::Rejected(rejected) = slot.offer(op("second")) else {
			panic!("second offer should be rejected");
		};
		assert_eq!(rejected.payload, Operation::chat("second"));
		assert_eq!(slot.peek().map(|p| &p.payload), Some(&Operation::chat("first")));
	}

	#[test]
	fn drain_is_single_shot() {
		let mut slot = PendingSlot::new();
		slot.offer(op("balance"));

		assert_eq!(slot.drain().map(|p| p.payload), Some(Operation::chat("balance")));
		assert!(slot.drain().is_none());
		assert!(!slot.is_occupied());
	}

	#[test]
	fn admit_follows_policy() {
		let mut slot = PendingSlot::new();
		assert_eq!(slot.admit(op("a"), PendingPolicy::KeepFirst), Admission::Kept { replaced: None });
		let Admission::Rejected(rejected) = slot.admit(op("b"), PendingPolicy::KeepFirst) else {
			panic!("keep-first must reject the second operation");
		};
		assert_eq!(rejected.payload, Operation::chat("b"));

		let Admission::Kept { replaced: Some(replaced) } = slot.admit(op("c"), PendingPolicy::ReplaceWithLatest) else {
			panic!("replace-with-latest must displace the first operation");
		};
		assert_eq!(replaced.payload, Operation::chat("a"));
		assert_eq!(slot.discard().map(|p| p.payload), Some(Operation::chat("c")));
	}

	#[test]
	fn policy_parses_from_snake_case() {
		let policy: PendingPolicy = serde_json::from_str(r#""replace_with_latest""#).unwrap();
		assert_eq!(policy, PendingPolicy::ReplaceWithLatest);
		assert_eq!(PendingPolicy::default(), PendingPolicy::KeepFirst);
	}
}
