//! The exchange model shared by agents and conversation partners.
//!
//! This crate establishes a typed protocol between an agent and the party
//! that answers it (a live model, a recorded conversation being replayed,
//! or decorators around either), so that the agent loop does not depend
//! on where the responses come from.
//!
//! Types in this crate don't define any behavior beyond serialization,
//! instead they are the constraints that the implementors should adhere
//! to.

#![deny(missing_docs)]

mod conversation;
mod error;
pub mod legacy;
mod provider;
pub mod record;
mod request;
mod response;

pub use conversation::*;
pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
