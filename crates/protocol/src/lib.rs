//! Wire types for the financial-assistant backend API.
//!
//! This crate contains the serde-serializable request and response bodies
//! exchanged with the backend over HTTP, plus detection of the
//! "login required" signal that business endpoints embed in otherwise
//! successful responses.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Lenient: Optional fields default so older and newer servers both parse
//! * Stable: Changes only when the wire format changes
//!
//! Session orchestration is built on top of these types in `fi-client`.

pub mod operations;
pub mod session;
pub mod signal;

pub use operations::*;
pub use session::*;
pub use signal::*;
