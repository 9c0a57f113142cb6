//! Core logic including the agent loop, tool dispatching, partner
//! decorators and conversation logging.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
pub mod partner;
pub mod tool;

pub use agent::{Agent, AgentBuilder, DEFAULT_MAX_ITERATIONS, RunReport, StopReason};
